//! Deterministic per-tool evaluation rules.
//!
//! Each rule reads the well-known fields of one tool's payload and maps them
//! through fixed thresholds. A rule exists for every kind where the payload
//! shape is stable; the rest return `None` and go to the model tier.

use netpulse_tools::ToolKind;
use serde_json::Value;

/// Verdict without plan-position fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// One-line verdict
    pub summary: String,
    /// Observations
    pub findings: Vec<String>,
    /// Suggested actions
    pub recommendations: Vec<String>,
}

/// Round-trip latency class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyBucket {
    /// Under 30 ms
    Excellent,
    /// 30 to 100 ms
    Good,
    /// 100 to 300 ms
    Elevated,
    /// Over 300 ms
    Poor,
}

impl LatencyBucket {
    /// Classify a latency in milliseconds
    #[must_use]
    pub fn classify(ms: f64) -> Self {
        if ms < 30.0 {
            Self::Excellent
        } else if ms < 100.0 {
            Self::Good
        } else if ms <= 300.0 {
            Self::Elevated
        } else {
            Self::Poor
        }
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Elevated => "elevated",
            Self::Poor => "poor",
        }
    }
}

/// Packet-loss class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossBucket {
    /// No loss
    Healthy,
    /// Some loss
    Unstable,
    /// Everything lost
    Unreachable,
}

impl LossBucket {
    /// Classify a loss percentage
    #[must_use]
    pub fn classify(percent: f64) -> Self {
        if percent <= 0.0 {
            Self::Healthy
        } else if percent < 100.0 {
            Self::Unstable
        } else {
            Self::Unreachable
        }
    }
}

/// Run the rule for `kind`, if there is one
#[must_use]
pub fn assess(kind: ToolKind, data: &Value) -> Option<Assessment> {
    match kind {
        ToolKind::Ping => Some(ping(data)),
        ToolKind::ConnectivityCheck => Some(connectivity(data)),
        ToolKind::DnsLookup => Some(dns(data)),
        ToolKind::WifiScan => Some(wifi(data)),
        ToolKind::PortScan => Some(ports(data)),
        ToolKind::SslCheck => Some(ssl(data)),
        ToolKind::HttpCheck => Some(http(data)),
        ToolKind::NetworkInfo | ToolKind::Traceroute | ToolKind::PacketCapture => None,
    }
}

/// Read a number that may arrive as `12.5`, `"12.5"`, `"12.5ms"` or `"25%"`
fn number(data: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match data.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .trim_end_matches("ms")
            .trim()
            .parse()
            .ok(),
        _ => None,
    })
}

fn text<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str))
}

fn flag(data: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter()
        .find_map(|key| data.get(*key).and_then(Value::as_bool))
}

fn array<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter()
        .find_map(|key| data.get(*key).and_then(Value::as_array))
}

fn ping(data: &Value) -> Assessment {
    let host = text(data, &["host", "target"]).unwrap_or("the target");
    let loss = number(data, &["packet_loss", "loss", "packet_loss_percent"]).or_else(|| {
        let sent = number(data, &["packets_sent", "transmitted"])?;
        let received = number(data, &["packets_received", "received"])?;
        (sent > 0.0).then(|| (sent - received) / sent * 100.0)
    });
    let latency = number(data, &["avg_time", "avg_latency", "avg_rtt", "average_time", "avg"]);

    let mut findings = Vec::new();
    let mut recommendations = Vec::new();

    let loss_bucket = loss.map(LossBucket::classify);
    if let Some(loss) = loss {
        findings.push(format!("Packet loss to {}: {:.0}%", host, loss));
    }
    let latency_bucket = latency.map(LatencyBucket::classify);
    if let (Some(ms), Some(bucket)) = (latency, latency_bucket) {
        findings.push(format!("Average latency {:.1} ms ({})", ms, bucket.as_str()));
    }

    let summary = match loss_bucket {
        Some(LossBucket::Unreachable) => {
            recommendations.push("Check that the cable or WiFi is connected and the router is powered on".to_string());
            recommendations.push("Restart the router and modem, then test again".to_string());
            format!("{} is unreachable: every packet was lost", host)
        }
        Some(LossBucket::Unstable) => {
            recommendations.push("Move closer to the router or use a wired connection".to_string());
            recommendations.push("Check for interference or bandwidth-heavy devices on the network".to_string());
            format!("The connection to {} is unstable (packet loss detected)", host)
        }
        Some(LossBucket::Healthy) | None => match latency_bucket {
            Some(LatencyBucket::Poor) => {
                recommendations.push("Latency is very high; check for downloads or streaming on the network".to_string());
                "Network connectivity works but latency is poor".to_string()
            }
            Some(LatencyBucket::Elevated) => {
                recommendations.push("Latency is higher than usual; monitor whether it persists".to_string());
                "Network connectivity is normal, latency is elevated".to_string()
            }
            Some(_) => "Network connectivity is normal".to_string(),
            None if loss_bucket.is_some() => "Network connectivity is normal".to_string(),
            None => {
                findings.push("The ping result did not report loss or latency".to_string());
                recommendations.push("Run the ping again to get a complete result".to_string());
                "Ping finished without usable measurements".to_string()
            }
        },
    };

    Assessment {
        summary,
        findings,
        recommendations,
    }
}

fn connectivity(data: &Value) -> Assessment {
    let entries = array(data, &["results", "tests", "sites", "checks"]);
    let (reachable, total) = match entries {
        Some(items) if !items.is_empty() => {
            let ok = items
                .iter()
                .filter(|item| flag(item, &["reachable", "success", "accessible", "ok"]).unwrap_or(false))
                .count();
            (ok, items.len())
        }
        _ => match flag(data, &["internet_accessible", "connected", "reachable"]) {
            Some(true) => (1, 1),
            Some(false) => (0, 1),
            None => (0, 0),
        },
    };

    let mut findings = Vec::new();
    let mut recommendations = Vec::new();
    if total > 0 && entries.is_some() {
        findings.push(format!("{} of {} test sites reachable", reachable, total));
    }
    if let Some(items) = entries {
        for item in items {
            if flag(item, &["reachable", "success", "accessible", "ok"]) == Some(false) {
                if let Some(name) = text(item, &["name", "host", "url", "target"]) {
                    findings.push(format!("{} is not reachable", name));
                }
            }
        }
    }

    let summary = if total == 0 {
        recommendations.push("Run the connectivity check again".to_string());
        "The connectivity check returned no site results".to_string()
    } else if reachable == total {
        "Internet connectivity is normal".to_string()
    } else if reachable == 0 {
        recommendations.push("Check the router's WAN/internet light and restart the modem".to_string());
        recommendations.push("Contact your ISP if the outage persists".to_string());
        "No internet connectivity: none of the test sites could be reached".to_string()
    } else {
        recommendations.push("Some sites are blocked or down; try a different DNS server".to_string());
        "Internet connectivity is partial: some sites are unreachable".to_string()
    };

    Assessment {
        summary,
        findings,
        recommendations,
    }
}

fn dns(data: &Value) -> Assessment {
    let domain = text(data, &["domain", "host", "query"]).unwrap_or("the domain");
    let answers = array(data, &["ip_addresses", "addresses", "answers", "records"])
        .map(Vec::len)
        .unwrap_or(0);
    let resolved = flag(data, &["resolved", "success"]).unwrap_or(answers > 0) && answers > 0;
    let query_ms = number(data, &["query_time", "response_time", "resolution_time"]);

    let mut findings = vec![format!("{} record(s) returned for {}", answers, domain)];
    let mut recommendations = Vec::new();
    if let Some(server) = text(data, &["dns_server", "server", "resolver"]) {
        findings.push(format!("Resolver: {}", server));
    }
    if let Some(ms) = query_ms {
        findings.push(format!("Lookup took {:.0} ms", ms));
    }

    let summary = if !resolved {
        recommendations.push("Switch to a public DNS server such as 223.5.5.5 or 8.8.8.8".to_string());
        recommendations.push("Flush the local DNS cache".to_string());
        format!("DNS resolution for {} failed", domain)
    } else if query_ms.is_some_and(|ms| ms > 300.0) {
        recommendations.push("DNS is slow; consider a faster public resolver".to_string());
        format!("DNS resolution for {} works but is slow", domain)
    } else {
        format!("DNS resolution for {} is normal", domain)
    };

    Assessment {
        summary,
        findings,
        recommendations,
    }
}

/// Signal in dBm; percentages are mapped onto a dBm-like scale
fn signal_dbm(item: &Value) -> Option<f64> {
    if let Some(dbm) = number(item, &["signal_dbm", "rssi"]) {
        return Some(dbm);
    }
    let raw = number(item, &["signal", "signal_strength"])?;
    Some(if raw > 0.0 { raw / 2.0 - 100.0 } else { raw })
}

fn wifi(data: &Value) -> Assessment {
    let networks = array(data, &["networks", "access_points"]).cloned().unwrap_or_default();
    let current = data
        .get("current_network")
        .or_else(|| data.get("connected_network"))
        .filter(|v| v.is_object());

    let mut findings = vec![format!("{} wireless network(s) visible", networks.len())];
    let mut recommendations = Vec::new();

    let Some(current) = current else {
        if networks.is_empty() {
            recommendations.push("Make sure WiFi is turned on".to_string());
            return Assessment {
                summary: "No wireless networks were found".to_string(),
                findings,
                recommendations,
            };
        }
        recommendations.push("Connect to your network and scan again for signal details".to_string());
        return Assessment {
            summary: "WiFi scan completed; not connected to a wireless network".to_string(),
            findings,
            recommendations,
        };
    };

    let ssid = text(current, &["ssid", "name"]).unwrap_or("current network");
    let channel = number(current, &["channel"]);
    let same_channel = channel.map_or(0, |ch| {
        networks
            .iter()
            .filter(|n| number(n, &["channel"]) == Some(ch))
            .filter(|n| text(n, &["ssid", "name"]) != Some(ssid))
            .count()
    });
    if let Some(ch) = channel {
        findings.push(format!("{} is on channel {:.0}, shared with {} other network(s)", ssid, ch, same_channel));
    }

    let summary = match signal_dbm(current) {
        Some(dbm) => {
            findings.push(format!("Signal strength {:.0} dBm", dbm));
            if dbm >= -50.0 {
                format!("WiFi signal on {} is excellent", ssid)
            } else if dbm >= -67.0 {
                format!("WiFi signal on {} is good", ssid)
            } else if dbm >= -80.0 {
                recommendations.push("Move closer to the router or remove obstacles between them".to_string());
                format!("WiFi signal on {} is weak", ssid)
            } else {
                recommendations.push("Move closer to the router or add a mesh node / extender".to_string());
                format!("WiFi signal on {} is very weak", ssid)
            }
        }
        None => format!("Connected to {}; signal strength unknown", ssid),
    };

    if same_channel >= 5 {
        recommendations.push("The channel is congested; switch the router to a less crowded channel or to 5 GHz".to_string());
    }

    Assessment {
        summary,
        findings,
        recommendations,
    }
}

fn ports(data: &Value) -> Assessment {
    let host = text(data, &["host", "target"]).unwrap_or("the host");
    let mut open: Vec<String> = array(data, &["open_ports"])
        .map(|ports| ports.iter().map(port_label).collect())
        .unwrap_or_default();
    let mut closed: Vec<String> = array(data, &["closed_ports", "filtered_ports"])
        .map(|ports| ports.iter().map(port_label).collect())
        .unwrap_or_default();

    if let Some(results) = array(data, &["results", "ports"]) {
        for entry in results {
            let label = port_label(entry);
            let is_open = flag(entry, &["open"])
                .or_else(|| text(entry, &["status", "state"]).map(|s| s.eq_ignore_ascii_case("open")))
                .unwrap_or(false);
            if is_open {
                open.push(label);
            } else {
                closed.push(label);
            }
        }
    }

    let mut findings = Vec::new();
    if !open.is_empty() {
        findings.push(format!("Open: {}", open.join(", ")));
    }
    if !closed.is_empty() {
        findings.push(format!("Closed or filtered: {}", closed.join(", ")));
    }

    let mut recommendations = Vec::new();
    let summary = if open.is_empty() && closed.is_empty() {
        recommendations.push("Specify the ports to check and scan again".to_string());
        format!("Port scan of {} returned no port results", host)
    } else if open.is_empty() {
        recommendations.push("A firewall may be blocking these ports; check router and host firewall rules".to_string());
        format!("No scanned ports on {} are open", host)
    } else if closed.is_empty() {
        format!("All scanned ports on {} are open", host)
    } else {
        recommendations.push("Confirm the closed ports are expected to be closed".to_string());
        format!("{} of {} scanned ports on {} are open", open.len(), open.len() + closed.len(), host)
    };

    Assessment {
        summary,
        findings,
        recommendations,
    }
}

fn port_label(entry: &Value) -> String {
    match entry {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other
            .get("port")
            .map(|p| p.to_string())
            .unwrap_or_else(|| other.to_string()),
    }
}

fn ssl(data: &Value) -> Assessment {
    let host = text(data, &["host", "hostname", "domain"]).unwrap_or("the site");
    let valid = flag(data, &["valid", "is_valid", "success"]).unwrap_or(false);
    let days = number(data, &["days_until_expiry", "days_remaining", "days_left"]);

    let mut findings = Vec::new();
    let mut recommendations = Vec::new();
    if let Some(issuer) = text(data, &["issuer"]) {
        findings.push(format!("Issued by {}", issuer));
    }
    if let Some(days) = days {
        findings.push(format!("Expires in {:.0} day(s)", days));
    }
    if let Some(error) = text(data, &["error", "message"]) {
        findings.push(error.to_string());
    }

    let summary = if !valid || days.is_some_and(|d| d < 0.0) {
        recommendations.push("Do not enter sensitive data on this site until the certificate is fixed".to_string());
        recommendations.push("Check that the system clock is correct".to_string());
        format!("The SSL certificate for {} is not valid", host)
    } else if days.is_some_and(|d| d < 30.0) {
        recommendations.push("The certificate expires soon; the site owner should renew it".to_string());
        format!("The SSL certificate for {} is valid but expires soon", host)
    } else {
        format!("The SSL certificate for {} is valid", host)
    };

    Assessment {
        summary,
        findings,
        recommendations,
    }
}

fn http(data: &Value) -> Assessment {
    let url = text(data, &["url", "final_url"]).unwrap_or("the site");
    let status = number(data, &["status_code", "status"]).map(|s| s as u16);
    let elapsed = number(data, &["response_time", "elapsed_ms", "time"]);

    let mut findings = Vec::new();
    let mut recommendations = Vec::new();
    if let Some(code) = status {
        findings.push(format!("HTTP status {}", code));
    }
    if let Some(ms) = elapsed {
        findings.push(format!("Response time {:.0} ms", ms));
    }

    let summary = match status {
        Some(200..=399) => {
            if elapsed.is_some_and(|ms| ms > 2000.0) {
                recommendations.push("The site responds slowly; compare with other sites to rule out the local network".to_string());
                format!("{} is reachable but slow", url)
            } else {
                format!("{} is reachable and responding normally", url)
            }
        }
        Some(code @ 400..=499) => {
            recommendations.push("Check the address; the site rejected the request".to_string());
            format!("{} answered with client error {}", url, code)
        }
        Some(code) if code >= 500 => {
            recommendations.push("The problem is on the website's side; try again later".to_string());
            format!("{} answered with server error {}", url, code)
        }
        _ => {
            recommendations.push("Check DNS and connectivity, then retry".to_string());
            format!("{} could not be reached", url)
        }
    };

    Assessment {
        summary,
        findings,
        recommendations,
    }
}
