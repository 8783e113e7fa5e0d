//! 行映射
//!
//! 每种流的字段位置固定：
//! - accelerometer: `x,y,z`
//! - gps: `lon,lat`
//! - parking: `emptyCount,lon,lat`

use contracts::{Accelerometer, ContractError, GpsPoint, Parking, RawRow, StreamKind};

/// 校验字段数量
fn expect_fields<'a>(
    stream: &str,
    kind: StreamKind,
    row: &'a RawRow,
) -> Result<&'a [String], ContractError> {
    let expected = kind.fields().len();
    if row.fields.len() != expected {
        return Err(ContractError::malformed(
            stream,
            "row",
            row.fields.join(","),
            format!(
                "expected {expected} fields, got {} (line {})",
                row.fields.len(),
                row.line
            ),
        ));
    }
    Ok(&row.fields)
}

/// 只接受有限值：NaN / inf 无法落库，也无法以 JSON 传输
fn parse_f64(stream: &str, field: &str, value: &str) -> Result<f64, ContractError> {
    let parsed = value
        .parse::<f64>()
        .map_err(|e| ContractError::malformed(stream, field, value, e.to_string()))?;
    if !parsed.is_finite() {
        return Err(ContractError::malformed(stream, field, value, "non-finite value"));
    }
    Ok(parsed)
}

fn parse_count(stream: &str, field: &str, value: &str) -> Result<u32, ContractError> {
    value
        .parse::<u32>()
        .map_err(|e| ContractError::malformed(stream, field, value, e.to_string()))
}

/// 解析加速度计行
pub fn parse_accelerometer(stream: &str, row: &RawRow) -> Result<Accelerometer, ContractError> {
    let fields = expect_fields(stream, StreamKind::Accelerometer, row)?;
    Ok(Accelerometer {
        x: parse_f64(stream, "x", &fields[0])?,
        y: parse_f64(stream, "y", &fields[1])?,
        z: parse_f64(stream, "z", &fields[2])?,
    })
}

/// 解析 GPS 行
pub fn parse_gps(stream: &str, row: &RawRow) -> Result<GpsPoint, ContractError> {
    let fields = expect_fields(stream, StreamKind::Gps, row)?;
    Ok(GpsPoint {
        lon: parse_f64(stream, "lon", &fields[0])?,
        lat: parse_f64(stream, "lat", &fields[1])?,
    })
}

/// 解析停车位行
pub fn parse_parking(stream: &str, row: &RawRow) -> Result<Parking, ContractError> {
    let fields = expect_fields(stream, StreamKind::Parking, row)?;
    Ok(Parking {
        empty_count: parse_count(stream, "emptyCount", &fields[0])?,
        gps: GpsPoint {
            lon: parse_f64(stream, "lon", &fields[1])?,
            lat: parse_f64(stream, "lat", &fields[2])?,
        },
    })
}
