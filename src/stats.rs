use crate::model::ScanResultEntry;

/// Totals over the sites that have at least one medal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub sites_with_medals: usize,
    pub total_medals: usize,
}

impl ScanSummary {
    pub fn from_results(results: &[ScanResultEntry]) -> Self {
        results
            .iter()
            .filter(|r| r.count > 0)
            .fold(Self::default(), |acc, r| Self {
                sites_with_medals: acc.sites_with_medals + 1,
                total_medals: acc.total_medals + r.count,
            })
    }
}
