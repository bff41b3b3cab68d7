//! Up-front task plans: the fixed outreach plan and plans read from oracle output.

use serde::Deserialize;

/// A task as described by a plan, before the graph allocates its id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlannedTask {
    /// Plan-local id that other planned tasks may depend on
    #[serde(default)]
    pub id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PlannedTask {
    pub fn new(
        id: Option<&str>,
        description: impl Into<String>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            id: id.map(str::to_string),
            description: description.into(),
            dependencies,
        }
    }
}

pub const DEFAULT_OUTREACH_STEPS: [&str; 8] = [
    "Analyze user prompt to determine outreach goals",
    "Generate Ideal Customer Profile (ICP) based on user needs",
    "Find leads matching the ICP",
    "Research each lead for personalization",
    "Write personalized cold emails for each lead",
    "Get user approval for emails",
    "Send emails to leads",
    "Log interactions in CRM",
];

/// The eight outreach steps, each depending on the one before.
pub fn default_outreach_plan() -> Vec<PlannedTask> {
    linear_plan(DEFAULT_OUTREACH_STEPS.iter().copied())
}

/// Chain descriptions so each depends on its predecessor.
pub fn linear_plan<I, S>(descriptions: I) -> Vec<PlannedTask>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    descriptions
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            let id = format!("task-{}", i + 1);
            let deps = if i == 0 { vec![] } else { vec![format!("task-{i}")] };
            PlannedTask::new(Some(&id), d, deps)
        })
        .collect()
}

/// Read a plan out of free-form model output.
///
/// Accepts a JSON array of task objects or of plain description strings,
/// possibly wrapped in prose or a code fence. Returns `None` when nothing
/// usable is found.
pub fn parse_plan(text: &str) -> Option<Vec<PlannedTask>> {
    let json = json_array_span(text)?;
    let items: Vec<serde_json::Value> = serde_json::from_str(json).ok()?;

    let plan: Vec<PlannedTask> = if items.iter().all(|v| v.is_string()) {
        linear_plan(items.iter().filter_map(|v| v.as_str().map(str::to_string)))
    } else {
        items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    };

    (!plan.is_empty()).then_some(plan)
}

/// The span from the first `[` to the last `]`.
fn json_array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_is_a_chain() {
        let plan = default_outreach_plan();
        assert_eq!(plan.len(), 8);
        assert!(plan[0].dependencies.is_empty());
        assert_eq!(plan[5].dependencies, vec!["task-5".to_string()]);
        assert_eq!(plan[7].description, "Log interactions in CRM");
    }

    #[test]
    fn parses_objects_inside_prose() {
        let text = r#"Here is the plan:
```json
[{"id": "task-1", "description": "Research", "dependencies": []},
 {"id": "task-2", "description": "Email", "dependencies": ["task-1"]}]
```"#;
        let plan = parse_plan(text).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].dependencies, vec!["task-1".to_string()]);
    }

    #[test]
    fn parses_plain_strings_as_chain() {
        let plan = parse_plan(r#"["a", "b", "c"]"#).unwrap();
        assert_eq!(plan[2].dependencies, vec!["task-2".to_string()]);
    }

    #[test]
    fn rejects_unusable_output() {
        assert!(parse_plan("I cannot help with that").is_none());
        assert!(parse_plan("[]").is_none());
        assert!(parse_plan("[not json]").is_none());
    }
}
