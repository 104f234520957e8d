use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LedgerConfig {
    pub costs: CostSchedule,
    pub execution: ExecutionConfig,
}

/// Resource cost of each chargeable step. Deployment strategies differ only
/// in which of these they hit per instance.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CostSchedule {
    pub base_call: u64,
    pub full_deploy: u64,
    pub clone_deploy: u64,
    pub state_write: u64,
    pub state_read: u64,
    pub event: u64,
    pub value_transfer: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExecutionConfig {
    pub default_budget: u64,
    pub max_call_depth: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            costs: CostSchedule {
                base_call: 21_000,
                full_deploy: 200_000,
                clone_deploy: 36_000,
                state_write: 5_000,
                state_read: 2_100,
                event: 1_125,
                value_transfer: 9_000,
            },
            execution: ExecutionConfig {
                default_budget: 2_000_000,
                max_call_depth: 16,
            },
        }
    }
}

impl CostSchedule {
    /// What one eventless identity/controller pair costs: two clone
    /// deployments plus the ownership handover write.
    pub fn pair_cost(&self) -> u64 {
        2 * self.clone_deploy + self.state_write
    }
}

impl LedgerConfig {
    pub fn load_or_default(path: &str) -> Self {
        if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => {
                        println!("Config loaded from {}", path);
                        c
                    }
                    Err(e) => {
                        eprintln!("Error parsing config: {}. Using Defaults.", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    eprintln!("Error reading config: {}. Using Defaults.", e);
                    Self::default()
                }
            }
        } else {
            let config = Self::default();
            if let Ok(s) = toml::to_string_pretty(&config) {
                let _ = std::fs::write(path, s);
            }
            config
        }
    }
}
