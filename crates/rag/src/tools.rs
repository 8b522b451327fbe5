//! Known retrieval tools and plan resolution.
//!
//! Planner output names tools by string. Resolution turns each invocation
//! into a `ToolCall` variant before anything is executed, so a missing
//! required argument fails the request ahead of any network call.

use crate::types::{ExecutionPlan, ToolInvocation};
use catalyst_core::{AppError, AppResult};

/// Structured-fact lookup for a single mission.
pub const MISSION_FACTS_TOOL: &str = "get_mission_facts";

/// Semantic search over mission documents and comments.
pub const MISSION_CONTEXT_TOOL: &str = "find_mission_context";

pub const MISSION_NAME_ARG: &str = "mission_name";
pub const SEARCH_QUERY_ARG: &str = "search_query";

/// A resolved tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    MissionFacts { mission_name: String },
    MissionContext { search_query: String },
    /// A name outside the known set; executed as a no-op.
    Unrecognized { name: String },
}

impl ToolCall {
    /// Resolve one invocation. Blank arguments count as missing.
    pub fn resolve(invocation: &ToolInvocation) -> AppResult<Self> {
        match invocation.name.as_str() {
            MISSION_FACTS_TOOL => Ok(Self::MissionFacts {
                mission_name: required_argument(invocation, MISSION_NAME_ARG)?,
            }),
            MISSION_CONTEXT_TOOL => Ok(Self::MissionContext {
                search_query: required_argument(invocation, SEARCH_QUERY_ARG)?,
            }),
            other => Ok(Self::Unrecognized {
                name: other.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::MissionFacts { .. } => MISSION_FACTS_TOOL,
            Self::MissionContext { .. } => MISSION_CONTEXT_TOOL,
            Self::Unrecognized { name } => name,
        }
    }
}

/// Resolve every invocation of `plan`, in order.
pub fn resolve_plan(plan: &ExecutionPlan) -> AppResult<Vec<ToolCall>> {
    plan.invocations.iter().map(ToolCall::resolve).collect()
}

fn required_argument(invocation: &ToolInvocation, argument: &str) -> AppResult<String> {
    invocation
        .arguments
        .get(argument)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::MissingArgument {
            tool: invocation.name.clone(),
            argument: argument.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_known_tools() {
        let facts = ToolInvocation::new(MISSION_FACTS_TOOL, [(MISSION_NAME_ARG, "Apollo 11")]);
        assert_eq!(
            ToolCall::resolve(&facts).unwrap(),
            ToolCall::MissionFacts {
                mission_name: "Apollo 11".to_string()
            }
        );

        let context =
            ToolInvocation::new(MISSION_CONTEXT_TOOL, [(SEARCH_QUERY_ARG, " lunar landing ")]);
        assert_eq!(
            ToolCall::resolve(&context).unwrap(),
            ToolCall::MissionContext {
                search_query: "lunar landing".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_tool_resolves_to_no_op() {
        let invocation = ToolInvocation::new("delete_everything", [("target", "all")]);
        let call = ToolCall::resolve(&invocation).unwrap();
        assert_eq!(call.name(), "delete_everything");
        assert!(matches!(call, ToolCall::Unrecognized { .. }));
    }

    #[test]
    fn test_missing_or_blank_argument_is_fatal() {
        let missing = ToolInvocation::new(MISSION_FACTS_TOOL, [("mission", "Apollo 11")]);
        let err = ToolCall::resolve(&missing).unwrap_err();
        assert!(matches!(
            err,
            AppError::MissingArgument { ref argument, .. } if argument == MISSION_NAME_ARG
        ));

        let blank = ToolInvocation::new(MISSION_CONTEXT_TOOL, [(SEARCH_QUERY_ARG, "   ")]);
        assert!(matches!(
            ToolCall::resolve(&blank),
            Err(AppError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_resolve_plan_stops_at_first_missing_argument() {
        let plan = ExecutionPlan::new(vec![
            ToolInvocation::new(MISSION_CONTEXT_TOOL, [(SEARCH_QUERY_ARG, "fuel")]),
            ToolInvocation::new(MISSION_FACTS_TOOL, Vec::<(String, String)>::new()),
        ]);
        assert!(resolve_plan(&plan).is_err());
    }
}
