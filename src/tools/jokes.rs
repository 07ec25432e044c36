//! Joke tool

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::{json, Value};
use crate::Result;
use super::Tool;

const JOKES: [&str; 2] = [
    "Why did the chicken cross the road? Because it wanted to get to the other side",
    "Knock knock? Who's there? Doctor. Doctor Who?",
];

pub struct JokeTool;

#[async_trait]
impl Tool for JokeTool {
    fn name(&self) -> &str { "tell_joke" }
    fn description(&self) -> &str { "Tell a joke" }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _params: Value) -> Result<String> {
        let joke = JOKES.choose(&mut rand::thread_rng()).copied().unwrap_or(JOKES[0]);
        Ok(joke.to_string())
    }
}
