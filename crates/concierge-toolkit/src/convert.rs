//! Unit Conversion Tool

use async_trait::async_trait;
use serde_json::json;

use concierge_core::{
    Capability, CapabilitySchema, FailureKind, Observation, ParameterSchema, Result, ToolCall,
};

/// Converts between common units of length, mass, and temperature
pub struct UnitConvertTool;

#[async_trait]
impl Capability for UnitConvertTool {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema {
            name: "convert_unit".into(),
            description:
                "Convert a value between units (length: m/km/mi/ft, mass: g/kg/lb/oz, temperature: c/f/k)"
                    .into(),
            parameters: vec![
                ParameterSchema::required("value", "number", "The numeric value to convert"),
                ParameterSchema::required("from", "string", "Source unit (e.g. 'km')"),
                ParameterSchema::required("to", "string", "Target unit (e.g. 'mi')"),
            ],
            category: Some("utility".into()),
            has_side_effects: false,
            resource_kind: None,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<Observation> {
        let value = call
            .arguments
            .get("value")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0);
        let from = call
            .arguments
            .get("from")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let to = call
            .arguments
            .get("to")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        match convert(value, from, to) {
            Some(result) => Ok(Observation::ok_with_data(
                "convert_unit",
                format!("{} {} = {:.4} {}", value, from, result, to),
                json!({"value": result, "unit": to}),
            )),
            None => Ok(Observation::err(
                "convert_unit",
                FailureKind::ExecutionError,
                format!("cannot convert from '{}' to '{}'", from, to),
            )),
        }
    }
}

fn convert(value: f64, from: &str, to: &str) -> Option<f64> {
    let from = from.to_lowercase();
    let to = to.to_lowercase();

    if from == to {
        return Some(value);
    }

    // Temperature has offsets, everything else is a scale factor
    if let (Some(celsius), true) = (to_celsius(value, &from), is_temperature(&to)) {
        return from_celsius(celsius, &to);
    }

    let meters = to_meters(value, &from);
    if let Some(m) = meters {
        return from_meters(m, &to);
    }

    let grams = to_grams(value, &from);
    if let Some(g) = grams {
        return from_grams(g, &to);
    }

    None
}

fn is_temperature(unit: &str) -> bool {
    matches!(unit, "c" | "f" | "k" | "celsius" | "fahrenheit" | "kelvin")
}

fn to_celsius(value: f64, unit: &str) -> Option<f64> {
    match unit {
        "c" | "celsius" => Some(value),
        "f" | "fahrenheit" => Some((value - 32.0) * 5.0 / 9.0),
        "k" | "kelvin" => Some(value - 273.15),
        _ => None,
    }
}

fn from_celsius(celsius: f64, unit: &str) -> Option<f64> {
    match unit {
        "c" | "celsius" => Some(celsius),
        "f" | "fahrenheit" => Some(celsius * 9.0 / 5.0 + 32.0),
        "k" | "kelvin" => Some(celsius + 273.15),
        _ => None,
    }
}

fn to_meters(value: f64, unit: &str) -> Option<f64> {
    match unit {
        "m" => Some(value),
        "km" => Some(value * 1000.0),
        "cm" => Some(value / 100.0),
        "mi" => Some(value * 1609.344),
        "ft" => Some(value * 0.3048),
        "in" => Some(value * 0.0254),
        _ => None,
    }
}

fn from_meters(meters: f64, unit: &str) -> Option<f64> {
    match unit {
        "m" => Some(meters),
        "km" => Some(meters / 1000.0),
        "cm" => Some(meters * 100.0),
        "mi" => Some(meters / 1609.344),
        "ft" => Some(meters / 0.3048),
        "in" => Some(meters / 0.0254),
        _ => None,
    }
}

fn to_grams(value: f64, unit: &str) -> Option<f64> {
    match unit {
        "g" => Some(value),
        "kg" => Some(value * 1000.0),
        "lb" => Some(value * 453.592),
        "oz" => Some(value * 28.3495),
        _ => None,
    }
}

fn from_grams(grams: f64, unit: &str) -> Option<f64> {
    match unit {
        "g" => Some(grams),
        "kg" => Some(grams / 1000.0),
        "lb" => Some(grams / 453.592),
        "oz" => Some(grams / 28.3495),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversion() {
        let miles = convert(10.0, "km", "mi").unwrap();
        assert!((miles - 6.2137).abs() < 0.001);
    }

    #[test]
    fn test_temperature_conversion() {
        let f = convert(100.0, "c", "f").unwrap();
        assert!((f - 212.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cross_dimension_is_rejected() {
        assert!(convert(1.0, "kg", "mi").is_none());
    }

    #[tokio::test]
    async fn test_unknown_unit_is_a_failure_observation() {
        let call = ToolCall::new("convert_unit")
            .with_arg("value", serde_json::json!(1.0))
            .with_arg("from", serde_json::json!("parsec"))
            .with_arg("to", serde_json::json!("m"));
        let obs = UnitConvertTool.execute(&call).await.unwrap();
        assert!(!obs.is_ok());
    }
}
