use super::*;

#[test]
fn test_alias_normalization() {
    assert_eq!(ToolKind::from_id("ping"), Some(ToolKind::Ping));
    assert_eq!(ToolKind::from_id("ping_test"), Some(ToolKind::Ping));
    assert_eq!(ToolKind::from_id("  PING-TEST "), Some(ToolKind::Ping));
    assert_eq!(ToolKind::from_id("nslookup"), Some(ToolKind::DnsLookup));
    assert_eq!(ToolKind::from_id("tracert"), Some(ToolKind::Traceroute));
    assert_eq!(ToolKind::from_id("teleport"), None);
}

#[test]
fn test_aliases_are_unambiguous() {
    let mut seen = std::collections::HashSet::new();
    for kind in ToolKind::ALL {
        assert!(seen.insert(kind.id()), "duplicate id {}", kind.id());
        for alias in kind.aliases() {
            assert!(seen.insert(alias), "duplicate alias {}", alias);
        }
    }
}

#[test]
fn test_from_str_unknown_is_not_found() {
    let err = "warp_drive".parse::<ToolKind>().unwrap_err();
    assert!(matches!(err, Error::NotFound(id) if id == "warp_drive"));
}

#[test]
fn test_builtin_catalog_is_total() {
    let catalog = ToolCatalog::builtin();
    assert_eq!(catalog.len(), ToolKind::ALL.len());
    for kind in ToolKind::ALL {
        let def = catalog.get(kind).expect("every kind has a definition");
        assert_eq!(def.endpoint, format!("/api/tools/{}", kind.id()));
    }
}

#[test]
fn test_required_params_have_defaults() {
    for def in ToolCatalog::global().list() {
        for param in def.parameters.iter().filter(|p| p.required) {
            assert!(
                param.default.is_some(),
                "{}.{} is required but has no default",
                def.kind,
                param.name
            );
        }
    }
}

#[test]
fn test_tiers_order_basic_first() {
    let catalog = ToolCatalog::global();
    let basic: Vec<_> = catalog
        .by_tier(ToolTier::Basic)
        .iter()
        .map(|d| d.kind)
        .collect();
    assert_eq!(basic[0], ToolKind::Ping);
    assert!(basic.contains(&ToolKind::ConnectivityCheck));
    assert_eq!(
        catalog.by_tier(ToolTier::RarelyUsed)[0].kind,
        ToolKind::PacketCapture
    );
}

#[test]
fn test_default_params() {
    let def = ToolCatalog::global().get(ToolKind::Ping).unwrap();
    let params = def.default_params();
    assert_eq!(params["host"], "baidu.com");
    assert_eq!(params["count"], 4);
}

#[test]
fn test_resolve_via_alias() {
    let def = ToolCatalog::global().resolve("ssl_cert_check").unwrap();
    assert_eq!(def.kind, ToolKind::SslCheck);
    assert!(ToolCatalog::global().resolve("unknown").is_none());
}

#[test]
fn test_param_type_accepts() {
    assert!(ParamType::Integer.accepts(&json!(4)));
    assert!(!ParamType::Integer.accepts(&json!("4")));
    assert!(ParamType::String.accepts(&json!("x")));
    assert!(ParamType::Boolean.accepts(&json!(true)));
}

#[test]
fn test_tool_kind_serialization() {
    assert_eq!(
        serde_json::to_string(&ToolKind::ConnectivityCheck).unwrap(),
        "\"connectivity_check\""
    );
}
