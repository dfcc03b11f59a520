//! Catalog - the closed set of diagnostic tools
//!
//! Every tool the diagnosis core can recommend or run is a [`ToolKind`]
//! variant with one canonical id. External ids (model output, user input,
//! older clients) go through [`ToolKind::from_id`], which folds aliases such
//! as `ping_test` onto their canonical kind. The catalog itself is pure data.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Default probe target used when the user has not named one
const DEFAULT_HOST: &str = "baidu.com";

static BUILTIN_CATALOG: LazyLock<ToolCatalog> = LazyLock::new(ToolCatalog::builtin);

/// A diagnostic tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// ICMP echo against a host
    Ping,
    /// Reachability of a set of well-known sites
    ConnectivityCheck,
    /// Name resolution
    DnsLookup,
    /// Local interfaces, addresses and gateway
    NetworkInfo,
    /// Hop-by-hop path
    Traceroute,
    /// Nearby wireless networks and signal quality
    WifiScan,
    /// Open ports on a host
    PortScan,
    /// TLS certificate validity
    SslCheck,
    /// HTTP(S) reachability and response time
    HttpCheck,
    /// Background packet capture (long-running, session based)
    PacketCapture,
}

impl ToolKind {
    /// Every kind, in catalog order (basic first)
    pub const ALL: [ToolKind; 10] = [
        Self::Ping,
        Self::ConnectivityCheck,
        Self::DnsLookup,
        Self::NetworkInfo,
        Self::Traceroute,
        Self::WifiScan,
        Self::PortScan,
        Self::SslCheck,
        Self::HttpCheck,
        Self::PacketCapture,
    ];

    /// Canonical id
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::ConnectivityCheck => "connectivity_check",
            Self::DnsLookup => "dns_lookup",
            Self::NetworkInfo => "network_info",
            Self::Traceroute => "traceroute",
            Self::WifiScan => "wifi_scan",
            Self::PortScan => "port_scan",
            Self::SslCheck => "ssl_check",
            Self::HttpCheck => "http_check",
            Self::PacketCapture => "packet_capture",
        }
    }

    /// Legacy ids accepted at the ingestion boundary
    #[must_use]
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Ping => &["ping_test"],
            Self::ConnectivityCheck => &["internet_check", "network_connectivity"],
            Self::DnsLookup => &["dns", "nslookup", "dns_test"],
            Self::NetworkInfo => &["ip_info", "network_interfaces"],
            Self::Traceroute => &["trace_route", "tracert"],
            Self::WifiScan => &["wifi", "wifi_analysis"],
            Self::PortScan => &["port_check"],
            Self::SslCheck => &["ssl", "ssl_cert_check"],
            Self::HttpCheck => &["website_check", "http_request"],
            Self::PacketCapture => &["capture", "packet_capture_start"],
        }
    }

    /// Normalize an external id (canonical or alias, any case) to a kind.
    #[must_use]
    pub fn from_id(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|kind| {
            kind.id() == normalized || kind.aliases().contains(&normalized.as_str())
        })
    }

    /// Sophistication tier
    #[must_use]
    pub fn tier(&self) -> ToolTier {
        match self {
            Self::Ping | Self::ConnectivityCheck | Self::DnsLookup | Self::NetworkInfo => {
                ToolTier::Basic
            }
            Self::Traceroute
            | Self::WifiScan
            | Self::PortScan
            | Self::SslCheck
            | Self::HttpCheck => ToolTier::Advanced,
            Self::PacketCapture => ToolTier::RarelyUsed,
        }
    }

    /// Whether running this tool starts a background session that must be polled
    #[must_use]
    pub fn starts_background_session(&self) -> bool {
        matches!(self, Self::PacketCapture)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ToolKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_id(s).ok_or_else(|| Error::NotFound(s.to_string()))
    }
}

/// Sophistication tier, used to order tools in planning prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolTier {
    /// First-line checks
    Basic,
    /// Targeted follow-ups
    Advanced,
    /// Heavy tools reserved for stubborn problems
    RarelyUsed,
}

impl ToolTier {
    /// Every tier, basic first
    pub const ALL: [ToolTier; 3] = [Self::Basic, Self::Advanced, Self::RarelyUsed];

    /// Heading used when listing tools
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Basic => "Basic tools (use first)",
            Self::Advanced => "Advanced tools (targeted follow-up)",
            Self::RarelyUsed => "Rarely-used tools (only when clearly needed)",
        }
    }
}

/// Tool category for display grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Reachability and latency
    Connectivity,
    /// Name resolution
    Dns,
    /// Local configuration
    System,
    /// Wireless
    Wireless,
    /// Ports and certificates
    Security,
    /// Application-level checks
    Web,
    /// Traffic capture
    Capture,
}

impl ToolCategory {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::Dns => "dns",
            Self::System => "system",
            Self::Wireless => "wireless",
            Self::Security => "security",
            Self::Web => "web",
            Self::Capture => "capture",
        }
    }
}

/// Display priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolPriority {
    /// Run early
    High,
    /// Normal
    Medium,
    /// Run only when needed
    Low,
}

/// Parameter value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// JSON string
    String,
    /// JSON integer
    Integer,
    /// JSON boolean
    Boolean,
}

impl ParamType {
    /// Whether a JSON value has this type
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// One entry of a tool's parameter schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name
    pub name: String,
    /// Value type
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Default value, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether the collaborator needs it
    pub required: bool,
    /// Human-readable description
    pub description: String,
}

impl ParameterSpec {
    fn new(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            default: None,
            required: false,
            description: description.to_string(),
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Tool metadata and schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool kind
    pub kind: ToolKind,
    /// Display name
    pub name: String,
    /// What the tool checks (also shown to the planner)
    pub description: String,
    /// Category
    pub category: ToolCategory,
    /// Display priority
    pub priority: ToolPriority,
    /// Rough wall-clock estimate in seconds
    pub estimated_duration_secs: u32,
    /// Parameter schema
    pub parameters: Vec<ParameterSpec>,
    /// Collaborator endpoint path
    pub endpoint: String,
}

impl ToolDefinition {
    /// Create a new tool definition with the conventional endpoint path
    #[must_use]
    pub fn new(kind: ToolKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            category: ToolCategory::Connectivity,
            priority: ToolPriority::Medium,
            estimated_duration_secs: 5,
            parameters: Vec::new(),
            endpoint: format!("/api/tools/{}", kind.id()),
        }
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: ToolCategory) -> Self {
        self.category = category;
        self
    }

    /// Set the priority
    #[must_use]
    pub fn with_priority(mut self, priority: ToolPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the duration estimate
    #[must_use]
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.estimated_duration_secs = secs;
        self
    }

    /// Add a parameter
    #[must_use]
    pub fn with_param(mut self, param: ParameterSpec) -> Self {
        self.parameters.push(param);
        self
    }

    /// Find a parameter by name
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Object of every declared default
    #[must_use]
    pub fn default_params(&self) -> Value {
        let map: Map<String, Value> = self
            .parameters
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect();
        Value::Object(map)
    }

    /// One-line description for planning prompts
    #[must_use]
    pub fn prompt_line(&self) -> String {
        format!("- {}: {} ({})", self.kind.id(), self.description, self.name)
    }
}

/// Static registry of every diagnostic tool
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    definitions: HashMap<ToolKind, ToolDefinition>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ToolCatalog {
    /// Shared instance of the builtin catalog
    #[must_use]
    pub fn global() -> &'static ToolCatalog {
        &BUILTIN_CATALOG
    }

    /// Catalog with an explicit set of definitions
    #[must_use]
    pub fn from_definitions(definitions: impl IntoIterator<Item = ToolDefinition>) -> Self {
        Self {
            definitions: definitions.into_iter().map(|d| (d.kind, d)).collect(),
        }
    }

    /// The builtin catalog
    #[must_use]
    pub fn builtin() -> Self {
        use ParamType::{Integer, String as Str};

        let host = |description: &str| {
            ParameterSpec::new("host", Str, description)
                .required()
                .default_value(json!(DEFAULT_HOST))
        };

        Self::from_definitions([
            ToolDefinition::new(
                ToolKind::Ping,
                "Ping Test",
                "Measures reachability, packet loss and round-trip latency to a host",
            )
            .with_priority(ToolPriority::High)
            .with_duration(5)
            .with_param(host("Host name or IP address to ping"))
            .with_param(
                ParameterSpec::new("count", Integer, "Number of echo requests")
                    .default_value(json!(4)),
            ),
            ToolDefinition::new(
                ToolKind::ConnectivityCheck,
                "Connectivity Check",
                "Checks whether several well-known sites are reachable to separate local from upstream faults",
            )
            .with_priority(ToolPriority::High)
            .with_duration(8)
            .with_param(
                ParameterSpec::new("timeout", Integer, "Per-site timeout in seconds")
                    .default_value(json!(5)),
            ),
            ToolDefinition::new(
                ToolKind::DnsLookup,
                "DNS Lookup",
                "Resolves a domain and reports resolver, answers and lookup time",
            )
            .with_category(ToolCategory::Dns)
            .with_priority(ToolPriority::High)
            .with_duration(3)
            .with_param(
                ParameterSpec::new("domain", Str, "Domain name to resolve")
                    .required()
                    .default_value(json!(DEFAULT_HOST)),
            )
            .with_param(
                ParameterSpec::new("record_type", Str, "DNS record type")
                    .default_value(json!("A")),
            )
            .with_param(ParameterSpec::new(
                "dns_server",
                Str,
                "Resolver to query instead of the system default",
            )),
            ToolDefinition::new(
                ToolKind::NetworkInfo,
                "Network Information",
                "Lists local interfaces, IP addresses, default gateway and DNS servers",
            )
            .with_category(ToolCategory::System)
            .with_duration(2),
            ToolDefinition::new(
                ToolKind::Traceroute,
                "Traceroute",
                "Maps the hop-by-hop path to a host to locate where latency or loss begins",
            )
            .with_duration(30)
            .with_param(host("Destination host"))
            .with_param(
                ParameterSpec::new("max_hops", Integer, "Maximum number of hops")
                    .default_value(json!(30)),
            ),
            ToolDefinition::new(
                ToolKind::WifiScan,
                "WiFi Scan",
                "Scans nearby wireless networks for signal strength, channel congestion and interference",
            )
            .with_category(ToolCategory::Wireless)
            .with_duration(10),
            ToolDefinition::new(
                ToolKind::PortScan,
                "Port Scan",
                "Checks whether specific TCP ports on a host accept connections",
            )
            .with_category(ToolCategory::Security)
            .with_priority(ToolPriority::Low)
            .with_duration(15)
            .with_param(host("Host to scan"))
            .with_param(
                ParameterSpec::new("ports", Str, "Comma-separated port list")
                    .default_value(json!("80,443")),
            ),
            ToolDefinition::new(
                ToolKind::SslCheck,
                "SSL Certificate Check",
                "Validates a site's TLS certificate chain, expiry and hostname match",
            )
            .with_category(ToolCategory::Security)
            .with_priority(ToolPriority::Low)
            .with_duration(5)
            .with_param(host("Host presenting the certificate"))
            .with_param(
                ParameterSpec::new("port", Integer, "TLS port").default_value(json!(443)),
            ),
            ToolDefinition::new(
                ToolKind::HttpCheck,
                "Website Check",
                "Fetches a URL and reports status code, response time and redirects",
            )
            .with_category(ToolCategory::Web)
            .with_duration(5)
            .with_param(
                ParameterSpec::new("url", Str, "URL to fetch")
                    .required()
                    .default_value(json!(format!("https://www.{}", DEFAULT_HOST))),
            ),
            ToolDefinition::new(
                ToolKind::PacketCapture,
                "Packet Capture",
                "Captures traffic in the background for later protocol-level analysis",
            )
            .with_category(ToolCategory::Capture)
            .with_priority(ToolPriority::Low)
            .with_duration(60)
            .with_param(
                ParameterSpec::new("target", Str, "Host or domain whose traffic to capture")
                    .default_value(json!(DEFAULT_HOST)),
            )
            .with_param(
                ParameterSpec::new("mode", Str, "Capture mode (auto, dns, http, all)")
                    .default_value(json!("auto")),
            )
            .with_param(
                ParameterSpec::new("duration", Integer, "Capture length in seconds")
                    .default_value(json!(30)),
            ),
        ])
    }

    /// Definition for a kind
    #[must_use]
    pub fn get(&self, kind: ToolKind) -> Option<&ToolDefinition> {
        self.definitions.get(&kind)
    }

    /// Definition for an external id, after alias normalization
    #[must_use]
    pub fn resolve(&self, raw_id: &str) -> Option<&ToolDefinition> {
        ToolKind::from_id(raw_id).and_then(|kind| self.get(kind))
    }

    /// All definitions in catalog order
    #[must_use]
    pub fn list(&self) -> Vec<&ToolDefinition> {
        ToolKind::ALL
            .iter()
            .filter_map(|kind| self.definitions.get(kind))
            .collect()
    }

    /// Definitions of one tier, in catalog order
    #[must_use]
    pub fn by_tier(&self, tier: ToolTier) -> Vec<&ToolDefinition> {
        self.list()
            .into_iter()
            .filter(|def| def.kind.tier() == tier)
            .collect()
    }

    /// Number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests;
