//! Calculator tool - adds two numbers

use async_trait::async_trait;
use serde_json::{json, Value};
use crate::Result;
use crate::error::Error;
use super::Tool;

pub struct CalculatorTool;

fn number_param(params: &Value, name: &str) -> Result<f64> {
    params.get(name)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| Error::Tool(format!("Missing or non-numeric '{}' parameter", name)))
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str { "calculator" }
    fn description(&self) -> &str { "Add two numbers together and return the sum" }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": {
                    "type": "number",
                    "description": "First number"
                },
                "b": {
                    "type": "number",
                    "description": "Second number"
                }
            },
            "required": ["a", "b"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let a = number_param(&params, "a")?;
        let b = number_param(&params, "b")?;
        Ok((a + b).to_string())
    }
}
