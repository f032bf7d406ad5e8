//! Calculator Tool
//!
//! Evaluates arithmetic expressions.

use async_trait::async_trait;

use concierge_core::{
    Capability, CapabilitySchema, FailureKind, Observation, ParameterSchema, Result, ToolCall,
};

/// Arithmetic expression evaluator
pub struct CalculatorTool;

#[async_trait]
impl Capability for CalculatorTool {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema {
            name: "calculate".into(),
            description: "Evaluate a mathematical expression".into(),
            parameters: vec![ParameterSchema::required(
                "expression",
                "string",
                "Mathematical expression to evaluate (e.g., '2 + 2', '10 * 5')",
            )],
            category: Some("math".into()),
            has_side_effects: false,
            resource_kind: None,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<Observation> {
        let expr = call
            .arguments
            .get("expression")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        match evaluate_expression(expr) {
            Ok(result) => Ok(Observation::ok(
                "calculate",
                format!("{} = {}", expr, result),
            )),
            Err(e) => Ok(Observation::err(
                "calculate",
                FailureKind::ExecutionError,
                e,
            )),
        }
    }
}

/// Simple recursive-descent evaluator over +, -, *, /, ^ and parentheses
fn evaluate_expression(expr: &str) -> std::result::Result<f64, String> {
    let expr = expr.replace(' ', "");
    if expr.is_empty() {
        return Err("Empty expression".into());
    }

    // Handle parentheses recursively
    if let Some(start) = expr.rfind('(') {
        if let Some(end) = expr[start..].find(')') {
            let inner = &expr[start + 1..start + end];
            let inner_result = evaluate_expression(inner)?;
            let new_expr = format!(
                "{}{}{}",
                &expr[..start],
                inner_result,
                &expr[start + end + 1..]
            );
            return evaluate_expression(&new_expr);
        }
    }

    // Addition/subtraction (lowest precedence, evaluated last)
    for (i, c) in expr.char_indices().rev() {
        if i > 0 && (c == '+' || c == '-') {
            // Make sure it's not a unary minus
            let prev_char = expr.chars().nth(i - 1).unwrap_or(' ');
            if prev_char.is_ascii_digit() || prev_char == ')' {
                let left = evaluate_expression(&expr[..i])?;
                let right = evaluate_expression(&expr[i + 1..])?;
                return Ok(if c == '+' { left + right } else { left - right });
            }
        }
    }

    // Multiplication/division
    for (i, c) in expr.char_indices().rev() {
        if c == '*' || c == '/' {
            let left = evaluate_expression(&expr[..i])?;
            let right = evaluate_expression(&expr[i + 1..])?;
            if c == '/' && right == 0.0 {
                return Err("Division by zero".into());
            }
            return Ok(if c == '*' { left * right } else { left / right });
        }
    }

    // Power
    if let Some(i) = expr.find('^') {
        let left = evaluate_expression(&expr[..i])?;
        let right = evaluate_expression(&expr[i + 1..])?;
        return Ok(left.powf(right));
    }

    expr.parse::<f64>()
        .map_err(|e| format!("Parse error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evaluator() {
        assert!((evaluate_expression("2 + 2").unwrap() - 4.0).abs() < f64::EPSILON);
        assert!((evaluate_expression("10 * 5").unwrap() - 50.0).abs() < f64::EPSILON);
        assert!((evaluate_expression("(2 + 3) * 4").unwrap() - 20.0).abs() < f64::EPSILON);
        assert!((evaluate_expression("2 ^ 8").unwrap() - 256.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_division_by_zero() {
        assert!(evaluate_expression("1 / 0").is_err());
    }

    #[tokio::test]
    async fn test_bad_expression_is_a_failure_observation() {
        let call = ToolCall::new("calculate").with_arg("expression", json!("what"));
        let obs = CalculatorTool.execute(&call).await.unwrap();
        assert!(!obs.is_ok());
    }
}
