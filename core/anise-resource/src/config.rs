use crate::codec::{Background, ResourceFormat};
use crate::key::UrlTemplate;
use crate::render::Viewport;
use crate::store::Ttl;
use anise_model::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default TTL for network and render backed resources.
pub const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

/// Site the remote resources and rendered pages come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    pub base_url: String,
    pub calendar_url: String,
    pub timeout_secs: u64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "https://meteorhouse.wiki".to_string(),
            calendar_url: "https://wf-calendar.miaowm5.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl OriginConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Screenshot service used for rendered resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Endpoint accepting JSON render requests; rendering is unavailable
    /// when unset.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub viewport: Viewport,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 60,
            viewport: Viewport::default(),
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// How a resource group acquires content on a cache miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum AcquireConfig {
    /// Static file under the local resource root, probed by extension.
    Local {
        #[serde(default = "default_probe_formats")]
        formats: Vec<ResourceFormat>,
    },
    Remote { url: UrlTemplate },
    Render { url: UrlTemplate, selector: String },
}

fn default_probe_formats() -> Vec<ResourceFormat> {
    ResourceFormat::PROBE_ORDER.to_vec()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostProcessConfig {
    /// Composite onto the cache background color.
    Flatten,
}

/// One named category of entity resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupConfig {
    /// Entity kinds the group applies to.
    pub kinds: Vec<EntityKind>,
    #[serde(flatten)]
    pub acquire: AcquireConfig,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Overrides the cache default; negative never expires.
    #[serde(default)]
    pub ttl_secs: Option<i64>,
    #[serde(default)]
    pub post_process: Option<PostProcessConfig>,
    /// Re-encode fetched bytes to their canonical image form.
    #[serde(default = "default_true")]
    pub reencode: bool,
}

fn default_suffix() -> String {
    "png".to_string()
}

fn default_true() -> bool {
    true
}

impl ResourceGroupConfig {
    pub fn remote(kinds: &[EntityKind], url: &str, suffix: &str) -> Self {
        Self {
            kinds: kinds.to_vec(),
            acquire: AcquireConfig::Remote {
                url: UrlTemplate::new(url),
            },
            suffix: suffix.to_string(),
            ttl_secs: None,
            post_process: None,
            reencode: true,
        }
    }

    pub fn render(kinds: &[EntityKind], url: &str, selector: &str) -> Self {
        Self {
            kinds: kinds.to_vec(),
            acquire: AcquireConfig::Render {
                url: UrlTemplate::new(url),
                selector: selector.to_string(),
            },
            suffix: default_suffix(),
            ttl_secs: None,
            post_process: None,
            reencode: true,
        }
    }

    pub fn local(kinds: &[EntityKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            acquire: AcquireConfig::Local {
                formats: default_probe_formats(),
            },
            suffix: default_suffix(),
            ttl_secs: Some(-1),
            post_process: None,
            reencode: false,
        }
    }

    #[must_use]
    pub fn flattened(mut self) -> Self {
        self.post_process = Some(PostProcessConfig::Flatten);
        self
    }

    /// Group TTL: explicit override, else never for local files and
    /// `default_secs` for everything else.
    pub fn ttl(&self, default_secs: i64) -> Ttl {
        match (self.ttl_secs, &self.acquire) {
            (Some(secs), _) => Ttl::from_secs(secs),
            (None, AcquireConfig::Local { .. }) => Ttl::Never,
            (None, _) => Ttl::from_secs(default_secs),
        }
    }
}

/// Cache layout and resource groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache files, relative to the data root.
    pub cache_dir: PathBuf,
    /// Static local resources, relative to the data root.
    pub local_dir: PathBuf,
    pub default_ttl_secs: i64,
    /// Share one acquisition between concurrent identical misses.
    pub dedupe_in_flight: bool,
    pub background: Background,
    pub groups: BTreeMap<String, ResourceGroupConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("resources/cache"),
            local_dir: PathBuf::from("resources"),
            default_ttl_secs: DEFAULT_TTL_SECS,
            dedupe_in_flight: true,
            background: Background::default(),
            groups: default_groups(),
        }
    }
}

/// Entity resource groups served by the wiki.
pub fn default_groups() -> BTreeMap<String, ResourceGroupConfig> {
    use EntityKind::{Character, Equipment};
    const UNIT: &str = "{origin}/static/worldflipper/unit";

    BTreeMap::from([
        (
            "full_shot_0".to_string(),
            ResourceGroupConfig::remote(&[Character], &format!("{UNIT}/full_resized/base/{{key}}.png"), "png")
                .flattened(),
        ),
        (
            "full_shot_1".to_string(),
            ResourceGroupConfig::remote(&[Character], &format!("{UNIT}/full_resized/awakened/{{key}}.png"), "png")
                .flattened(),
        ),
        (
            "pixelart/special".to_string(),
            ResourceGroupConfig::remote(&[Character], &format!("{UNIT}/pixelart/special/{{key}}.gif"), "gif"),
        ),
        (
            "pixelart/walk_front".to_string(),
            ResourceGroupConfig::remote(&[Character], &format!("{UNIT}/pixelart/walk_front/{{key}}.gif"), "gif"),
        ),
        (
            "pixelart/kachidoki".to_string(),
            ResourceGroupConfig::remote(&[Character], &format!("{UNIT}/pixelart/kachidoki/{{key}}.gif"), "gif"),
        ),
        (
            "wikicard".to_string(),
            ResourceGroupConfig::render(&[Character, Equipment], "{origin}/card/{kind}/?wf_id={id}", "#main-card"),
        ),
        (
            "square212x/base".to_string(),
            ResourceGroupConfig::local(&[Character]),
        ),
    ])
}
