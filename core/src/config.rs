use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

/// How equal balances share a wealth rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMethod {
    /// 1, 2, 2, 3: ranks never skip.
    #[default]
    Dense,
    /// 1, 2, 2, 4: ties consume the positions they occupy.
    Standard,
}

/// Reporting contract of the data-test runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Run every test, report all failures.
    #[default]
    CollectAll,
    /// Stop at the first failing test.
    FailFast,
}

/// Inclusive upper rank bounds for each tier. Anything above
/// `silver_max_rank` is Bronze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub platinum_max_rank: u64,
    pub gold_max_rank: u64,
    pub silver_max_rank: u64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            platinum_max_rank: 100,
            gold_max_rank: 500,
            silver_max_rank: 1000,
        }
    }
}

impl TierThresholds {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.platinum_max_rank == 0 {
            return Err(PipelineError::InvalidConfig(
                "platinum_max_rank must be at least 1".into(),
            ));
        }
        if !(self.platinum_max_rank < self.gold_max_rank
            && self.gold_max_rank < self.silver_max_rank)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "tier thresholds must be strictly increasing, got {} / {} / {}",
                self.platinum_max_rank, self.gold_max_rank, self.silver_max_rank
            )));
        }
        Ok(())
    }
}

/// Parameters for the synthetic `raw_customer` generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub rows: usize,
    pub segments: Vec<String>,
    pub nation_count: i64,
    pub min_balance: f64,
    pub max_balance: f64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            rows: 1500,
            segments: ["AUTOMOBILE", "BUILDING", "FURNITURE", "HOUSEHOLD", "MACHINERY"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            nation_count: 25,
            min_balance: -999.99,
            max_balance: 9999.99,
        }
    }
}

// ── Column constraints (schema.json) ───────────────────────────────

/// A declarative data test attached to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum ColumnTest {
    Unique,
    NotNull,
    AcceptedValues { values: Vec<String> },
    /// Every non-null value must exist in `to.field`.
    Relationships { to: String, field: String },
}

impl ColumnTest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::NotNull => "not_null",
            Self::AcceptedValues { .. } => "accepted_values",
            Self::Relationships { .. } => "relationships",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tests: Vec<ColumnTest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, Deserialize)]
struct SchemaFile {
    models: Vec<ModelSchema>,
}

#[derive(Debug, Clone, Deserialize)]
struct PipelineFile {
    #[serde(default)]
    rank_method: RankMethod,
    #[serde(default)]
    tiers: TierThresholds,
    #[serde(default)]
    failure_mode: FailureMode,
    #[serde(default)]
    seed: SeedConfig,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub rank_method: RankMethod,
    pub tiers: TierThresholds,
    pub failure_mode: FailureMode,
    pub seed: SeedConfig,
    pub models: Vec<ModelSchema>,
}

impl PipelineConfig {
    /// Load from the data/ directory.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/pipeline.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: PipelineFile = serde_json::from_str(&content)?;

        let schema_path = format!("{data_dir}/schema.json");
        let schema_content = std::fs::read_to_string(&schema_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {schema_path}: {e}"))?;
        let schema: SchemaFile = serde_json::from_str(&schema_content)?;

        let config = Self {
            rank_method: file.rank_method,
            tiers: file.tiers,
            failure_mode: file.failure_mode,
            seed: file.seed,
            models: schema.models,
        };
        config.validate()?;
        Ok(config)
    }

    /// Built-in configuration mirroring data/, with a smaller seed population.
    pub fn default_test() -> Self {
        let accepted = |values: &[&str]| ColumnTest::AcceptedValues {
            values: values.iter().map(|v| v.to_string()).collect(),
        };
        let column = |name: &str, tests: Vec<ColumnTest>| ColumnSchema {
            name: name.into(),
            description: None,
            tests,
        };

        Self {
            rank_method: RankMethod::Dense,
            tiers: TierThresholds::default(),
            failure_mode: FailureMode::CollectAll,
            seed: SeedConfig {
                rows: 200,
                ..SeedConfig::default()
            },
            models: vec![
                ModelSchema {
                    name: "stg_customers".into(),
                    description: None,
                    columns: vec![
                        column("customer_key", vec![ColumnTest::Unique, ColumnTest::NotNull]),
                        column("customer_name", vec![ColumnTest::NotNull]),
                        column(
                            "balance_status",
                            vec![accepted(&[
                                "Positive Balance",
                                "Zero Balance",
                                "Negative Balance",
                            ])],
                        ),
                    ],
                },
                ModelSchema {
                    name: "dim_customers".into(),
                    description: None,
                    columns: vec![
                        column(
                            "customer_key",
                            vec![
                                ColumnTest::Unique,
                                ColumnTest::NotNull,
                                ColumnTest::Relationships {
                                    to: "stg_customers".into(),
                                    field: "customer_key".into(),
                                },
                            ],
                        ),
                        column(
                            "customer_tier",
                            vec![
                                ColumnTest::NotNull,
                                accepted(&["Platinum", "Gold", "Silver", "Bronze"]),
                            ],
                        ),
                    ],
                },
            ],
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        self.tiers.validate()?;
        if self.seed.min_balance > self.seed.max_balance {
            return Err(PipelineError::InvalidConfig(format!(
                "seed.min_balance ({}) exceeds seed.max_balance ({})",
                self.seed.min_balance, self.seed.max_balance
            )));
        }
        if self.seed.segments.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "seed.segments must not be empty".into(),
            ));
        }
        if self.seed.nation_count <= 0 {
            return Err(PipelineError::InvalidConfig(
                "seed.nation_count must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn schema_for(&self, model: &str) -> Option<&ModelSchema> {
        self.models.iter().find(|m| m.name == model)
    }
}
