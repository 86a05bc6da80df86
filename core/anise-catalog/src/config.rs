use anise_model::EntityKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One alias table file. Paths are relative to the data root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTableConfig {
    pub path: PathBuf,
    /// Kind assumed for bare numeric keys.
    #[serde(default)]
    pub kind: Option<EntityKind>,
}

/// Where entity overlays and alias tables are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding one sub-directory per source.
    pub data_dir: PathBuf,
    /// Sources in precedence order.
    pub sources: Vec<String>,
    /// Source preferred by lookups that do not name one.
    pub main_source: Option<String>,
    /// Seeded before entity names, in this order.
    pub alias_tables: Vec<AliasTableConfig>,
    pub fold_table: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sources: vec!["sc".to_string(), "jp".to_string()],
            main_source: Some("sc".to_string()),
            alias_tables: vec![
                AliasTableConfig {
                    path: PathBuf::from("resources/alias/character.toml"),
                    kind: Some(EntityKind::Character),
                },
                AliasTableConfig {
                    path: PathBuf::from("resources/alias/equipment.toml"),
                    kind: Some(EntityKind::Equipment),
                },
            ],
            fold_table: Some(PathBuf::from("config/script_fold.json")),
        }
    }
}
