use anyhow::Result;
use iothub_fixtures::fixtures::{self, ConnectionStringVariant};
use iothub_fixtures::{device_connection_string, ConnectionString, FixtureError, FixtureValues};

/// 測試 device 連線字串的固定格式
#[test]
fn test_device_connection_string_literal() {
    assert_eq!(
        device_connection_string("beauxbatons.academy-net", "MyPensieve", "Zm9vYmFy"),
        "HostName=beauxbatons.academy-net;DeviceId=MyPensieve;SharedAccessKey=Zm9vYmFy"
    );
}

/// ModuleId 一定在 SharedAccessKey 前面，GatewayHostName 一定在最後
#[test]
fn test_module_connection_string_field_order() {
    let values = FixtureValues::default();
    let with_gateway =
        fixtures::module_connection_string(&values, ConnectionStringVariant::ProtocolGateway);

    let keys: Vec<&str> = with_gateway
        .split(';')
        .map(|segment| segment.split_once('=').map(|(k, _)| k).unwrap_or(segment))
        .collect();
    assert_eq!(
        keys,
        vec!["HostName", "DeviceId", "ModuleId", "SharedAccessKey", "GatewayHostName"]
    );
}

#[test]
fn test_round_trip_for_every_variant() -> Result<()> {
    let values = FixtureValues {
        hostname: "durmstrang.academy-net".to_string(),
        device_id: "Karkaroff".to_string(),
        shared_access_key: "c2VjcmV0IGtleQ==".to_string(),
        ..Default::default()
    };

    for variant in ConnectionStringVariant::ALL {
        let device: ConnectionString =
            fixtures::device_connection_string(&values, variant).parse()?;
        assert_eq!(device.hostname, values.hostname);
        assert_eq!(device.device_id, values.device_id);
        assert_eq!(device.shared_access_key, values.shared_access_key);
        assert_eq!(device.module_id, None);

        let module = ConnectionString::parse(&fixtures::module_connection_string(&values, variant))?;
        assert_eq!(module.module_id.as_deref(), Some(values.module_id.as_str()));
        assert_eq!(module.to_string(), fixtures::module_connection_string(&values, variant));
    }
    Ok(())
}

#[test]
fn test_parser_rejects_invalid_strings() {
    for bad in [
        "not-a-connection-string",
        "",
        "HostName=h;DeviceId=d",
        "HostName=h;DeviceId=d;SharedAccessKey=k;Extra=1",
        "HostName=h;;DeviceId=d;SharedAccessKey=k",
    ] {
        let err = ConnectionString::parse(bad).unwrap_err();
        assert!(
            matches!(err, FixtureError::ConnectionStringError { .. }),
            "unexpected error for {:?}: {}",
            bad,
            err
        );
        assert!(err.is_credential_error());
    }
}
