//! Canned evaluations used when neither heuristics nor the model answer.

use super::heuristics::Assessment;
use netpulse_tools::ToolKind;

fn canned(summary: &str, findings: &[&str], recommendations: &[&str]) -> Assessment {
    Assessment {
        summary: summary.to_string(),
        findings: findings.iter().map(|s| s.to_string()).collect(),
        recommendations: recommendations.iter().map(|s| s.to_string()).collect(),
    }
}

/// Static evaluation for a kind; `None` gets the generic template
#[must_use]
pub fn template(kind: Option<ToolKind>) -> Assessment {
    match kind {
        Some(ToolKind::Ping) => canned(
            "Ping test completed",
            &["Review packet loss and average latency in the raw result"],
            &["Packet loss above 0% or latency above 100 ms points to a connection problem"],
        ),
        Some(ToolKind::ConnectivityCheck) => canned(
            "Connectivity check completed",
            &["Compare which test sites were reachable"],
            &["If no site is reachable, restart the router and check the ISP connection"],
        ),
        Some(ToolKind::DnsLookup) => canned(
            "DNS lookup completed",
            &["Check that the domain resolved to at least one address"],
            &["If resolution failed, try a public DNS server"],
        ),
        Some(ToolKind::NetworkInfo) => canned(
            "Network information collected",
            &["Local addresses, gateway and DNS servers are listed in the raw result"],
            &["An address starting with 169.254 means the device did not get an address from the router"],
        ),
        Some(ToolKind::Traceroute) => canned(
            "Traceroute completed",
            &["Look for the first hop where latency jumps or responses stop"],
            &["Problems in the first one or two hops are local; later hops point to the ISP or beyond"],
        ),
        Some(ToolKind::WifiScan) => canned(
            "WiFi scan completed",
            &["Check the signal strength of your network and how crowded its channel is"],
            &["Weak signal or a crowded channel can cause drops; move closer or change channel"],
        ),
        Some(ToolKind::PortScan) => canned(
            "Port scan completed",
            &["Open and closed ports are listed in the raw result"],
            &["Unexpected closed ports usually mean a firewall rule"],
        ),
        Some(ToolKind::SslCheck) => canned(
            "SSL certificate check completed",
            &["Check the certificate validity and expiry date"],
            &["An invalid certificate can also be caused by a wrong system clock"],
        ),
        Some(ToolKind::HttpCheck) => canned(
            "Website check completed",
            &["Check the HTTP status code and response time"],
            &["Status codes of 500 and above are problems on the website's side"],
        ),
        Some(ToolKind::PacketCapture) => canned(
            "Packet capture started",
            &["Traffic is being captured in the background"],
            &["Wait for the capture to finish; its analysis is reported when it completes"],
        ),
        None => canned(
            "Diagnostic step completed",
            &["The result was recorded; automatic interpretation is unavailable"],
            &["Review the raw result or continue with the next step"],
        ),
    }
}
