use std::fmt;

/// Per-run counters, threaded through the orchestrator and returned to
/// the caller instead of being accumulated in module state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub scanner_groups_created: usize,
    pub inventory_groups_created: usize,
    pub domains_to_scanner: usize,
    pub domains_to_inventory: usize,
    pub ips_to_inventory: usize,
    pub sites_to_inventory: usize,
    pub policies_created: usize,
    pub schedulers_created: usize,
    pub anomalies: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanner groups +{}, inventory groups +{}, domains to scanner +{}, \
             domains to inventory +{}, ips +{}, sites +{}, policies +{}, \
             schedulers +{}, anomalies {}",
            self.scanner_groups_created,
            self.inventory_groups_created,
            self.domains_to_scanner,
            self.domains_to_inventory,
            self.ips_to_inventory,
            self.sites_to_inventory,
            self.policies_created,
            self.schedulers_created,
            self.anomalies,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reports_every_counter() {
        let s = RunSummary {
            domains_to_scanner: 2,
            anomalies: 1,
            ..Default::default()
        };
        let line = s.to_string();
        assert!(line.contains("domains to scanner +2"));
        assert!(line.contains("anomalies 1"));
    }
}
