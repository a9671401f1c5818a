//! Demo workflows shipped with the binary
//!
//! Decisions are made by scripted and rule-based bindings, so every demo runs
//! offline and deterministically.

use std::fmt;

use clap::ValueEnum;
use serde_json::{json, Value};
use tracing::info;

use crate::agent::{Action, Agent, DecisionRequest, FnBinding};
use crate::core::{Result, ToolResult};
use crate::tools::{builtin, Tool};
use crate::workflow::{ParallelFlow, RoutePredicate, RouterFlow, SequentialFlow, Workflow};

/// Workflows selectable with `--workflow`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoWorkflow {
    /// Three-step pipeline passing state forward
    Pipeline,
    /// Classifier routing to LeftAgent or RightAgent
    Router,
    /// Two tasks run concurrently
    Parallel,
    /// Weather assistant with a lookup tool
    Weather,
}

impl DemoWorkflow {
    pub fn build(self) -> Result<Workflow> {
        match self {
            DemoWorkflow::Pipeline => pipeline(),
            DemoWorkflow::Router => router(),
            DemoWorkflow::Parallel => parallel(),
            DemoWorkflow::Weather => weather(),
        }
    }

    /// Prompt used when none is given
    pub fn sample_prompt(self) -> &'static str {
        match self {
            DemoWorkflow::Pipeline => "Please start the processing pipeline.",
            DemoWorkflow::Router => "Process query for option A",
            DemoWorkflow::Parallel => "Run both tasks.",
            DemoWorkflow::Weather => "What is the weather in London?",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

impl fmt::Display for DemoWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DemoWorkflow::Pipeline => "pipeline",
            DemoWorkflow::Router => "router",
            DemoWorkflow::Parallel => "parallel",
            DemoWorkflow::Weather => "weather",
        };
        f.write_str(name)
    }
}

/// Three agents, each calling its step tool once, ending on `workflow_complete`
pub fn pipeline() -> Result<Workflow> {
    let step_1 = Tool::from_fn(
        "process_step_1",
        "Step 1: updates state and returns a message",
        |_, ctx| {
            info!("step 1: writing step1_data");
            ctx.set("step1_status", "completed");
            ctx.set("step1_data", "Initial data processed");
            Ok(ToolResult::success().with("message", "Initial processing complete."))
        },
    );

    let step_2 = Tool::from_fn(
        "process_step_2",
        "Step 2: reads step 1 data and records the processed form",
        |_, ctx| {
            let data = ctx
                .get_str("step1_data")
                .unwrap_or_else(|| "No data from step 1".to_string());
            ctx.set("step2_status", "completed");
            ctx.set("step2_processed_data", format!("Processed: {}", data));
            Ok(ToolResult::success().with("message", "Intermediate processing complete."))
        },
    );

    let step_3 = Tool::from_fn(
        "process_step_3",
        "Step 3: finalizes the result and completes the workflow",
        |_, ctx| {
            let data = ctx
                .get_str("step2_processed_data")
                .unwrap_or_else(|| "No data from step 2".to_string());
            ctx.set("step3_status", "completed");
            ctx.set("final_result", format!("Finalized: {}", data));
            ctx.set(builtin::WORKFLOW_COMPLETE, true);
            Ok(ToolResult::success()
                .with("message", "Final processing complete.")
                .with(builtin::WORKFLOW_COMPLETE, true))
        },
    );

    let agent_1 = Agent::builder("AgentStep1")
        .description("First step agent.")
        .instruction("You initiate the pipeline. Use 'process_step_1' to start processing.")
        .tool(step_1)
        .scripted(vec![
            Action::tool("process_step_1", json!({})),
            Action::text("Step 1 done."),
        ])
        .build()?;

    let agent_2 = Agent::builder("AgentStep2")
        .description("Second step agent.")
        .instruction("You perform intermediate processing. Use 'process_step_2'.")
        .tool(step_2)
        .scripted(vec![
            Action::tool("process_step_2", json!({})),
            Action::text("Step 2 done."),
        ])
        .build()?;

    let agent_3 = Agent::builder("AgentStep3")
        .description("Third and final step agent that concludes the workflow.")
        .instruction("You are the final agent. Use 'process_step_3' to complete the workflow.")
        .tool(step_3)
        .binding(FnBinding::new(|req: &DecisionRequest| {
            Ok(match req.last_observation() {
                None => Action::tool("process_step_3", json!({})),
                Some(_) => Action::text(format!(
                    "Pipeline complete: {}",
                    req.state
                        .get("final_result")
                        .and_then(Value::as_str)
                        .unwrap_or("no result")
                )),
            })
        }))
        .build()?;

    let flow = SequentialFlow::new("ProcessingPipeline")
        .then(agent_1)
        .then(agent_2)
        .then(agent_3)
        .until_flag(builtin::WORKFLOW_COMPLETE);

    Workflow::new("pipeline", flow)
}

/// Classifier answering `RESULT: option_A|option_B|unknown`
fn classify(request: &DecisionRequest) -> Result<Action> {
    let query = request.user_message.to_lowercase();
    let result = if query.contains("option a") {
        "RESULT: option_A"
    } else if query.contains("option b") {
        "RESULT: option_B"
    } else {
        "RESULT: unknown"
    };
    Ok(Action::text(result))
}

pub fn router() -> Result<Workflow> {
    let result_agent = Agent::builder("ResultAgent")
        .instruction("Respond with 'RESULT: option_A', 'RESULT: option_B' or 'RESULT: unknown'.")
        .binding(FnBinding::new(classify))
        .build()?;

    let left = Agent::builder("LeftAgent")
        .instruction("Confirm that you are handling option A.")
        .scripted(vec![Action::text("LeftAgent here: handling option A.")])
        .build()?;

    let right = Agent::builder("RightAgent")
        .instruction("Confirm that you are handling option B.")
        .scripted(vec![Action::text("RightAgent here: handling option B.")])
        .build()?;

    let flow = RouterFlow::new("OrchestratorAgent", result_agent)
        .route(RoutePredicate::contains("option_A"), left)
        .route(RoutePredicate::contains("option_B"), right)
        .fallback_inform();

    Workflow::new("router", flow)
}

fn task_agent(name: &str, task: &'static str) -> Result<std::sync::Arc<Agent>> {
    let tool_name = format!("perform_task_{}", task.to_lowercase());
    let tool = Tool::from_fn(
        tool_name.clone(),
        format!("Perform task {} and save its result", task),
        move |_, ctx| {
            let result = format!("Task {} result", task);
            ctx.set(format!("task_{}_result", task.to_lowercase()), result.clone());
            ctx.set("last_task", task);
            Ok(ToolResult::success().with("result", result))
        },
    );

    Agent::builder(name)
        .description(format!("Agent responsible for Task {}.", task))
        .instruction(format!(
            "Perform Task {} independently and save result to state.",
            task
        ))
        .tool(tool)
        .scripted(vec![
            Action::tool(tool_name, json!({})),
            Action::text(format!("Task {} finished.", task)),
        ])
        .output_key(format!("task_{}_summary", task.to_lowercase()))
        .build()
}

pub fn parallel() -> Result<Workflow> {
    let flow = ParallelFlow::new("ConcurrentTasksExecutor")
        .branch(task_agent("TaskAgentA", "A")?)
        .branch(task_agent("TaskAgentB", "B")?);

    Workflow::new("parallel", flow)
}

/// Mock weather lookup; unknown cities are a domain failure
pub fn get_weather() -> Tool {
    Tool::from_fn(
        "get_weather",
        "Retrieves the current weather report for a specified city",
        |args, _| {
            let city = args.get("city").and_then(Value::as_str).unwrap_or_default();
            let report = match city.to_lowercase().replace(' ', "").as_str() {
                "newyork" => "The weather in New York is sunny with a temperature of 25°C.",
                "london" => "It's cloudy in London with a temperature of 15°C.",
                "tokyo" => "Tokyo is experiencing light rain and a temperature of 18°C.",
                _ => {
                    return Ok(ToolResult::error(format!(
                        "Sorry, I don't have weather information for '{}'.",
                        city
                    )));
                }
            };
            Ok(ToolResult::success().with("report", report))
        },
    )
    .with_parameters(json!({
        "type": "object",
        "properties": {
            "city": { "type": "string", "description": "Name of the city" }
        },
        "required": ["city"]
    }))
}

/// City named after the last " in " of the message
fn mentioned_city(message: &str) -> Option<String> {
    let lower = message.to_ascii_lowercase();
    let start = lower.rfind(" in ")? + 4;
    let city = message[start..]
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim();
    (!city.is_empty()).then(|| city.to_string())
}

fn weather_decision(request: &DecisionRequest) -> Result<Action> {
    if let Some(observation) = request.last_observation() {
        let result = &observation.result;
        let key = if result.is_success() { "report" } else { "error_message" };
        let text = result
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("The weather service returned nothing.");
        return Ok(Action::text(text));
    }

    Ok(match mentioned_city(&request.user_message) {
        Some(city) => Action::tool("get_weather", json!({ "city": city })),
        None => Action::text("Ask me about the weather in a specific city."),
    })
}

pub fn weather() -> Result<Workflow> {
    let agent = Agent::builder("weather_agent")
        .description("Provides weather information for specific cities.")
        .instruction(
            "You are a helpful weather assistant. Use 'get_weather' when a city is \
             mentioned and report errors politely.",
        )
        .tool(get_weather())
        .binding(FnBinding::new(weather_decision))
        .output_key("last_weather_report")
        .build()?;

    Workflow::new("weather", agent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_demos_validate() {
        for demo in DemoWorkflow::value_variants() {
            assert!(demo.build().is_ok(), "{} failed to build", demo);
        }
    }

    #[test]
    fn test_parse_name() {
        assert_eq!(DemoWorkflow::parse("Router"), Some(DemoWorkflow::Router));
        assert_eq!(DemoWorkflow::parse("nope"), None);
    }

    #[test]
    fn test_mentioned_city() {
        assert_eq!(
            mentioned_city("What is the weather in New York?").as_deref(),
            Some("New York")
        );
        assert_eq!(mentioned_city("weather please"), None);
    }
}
