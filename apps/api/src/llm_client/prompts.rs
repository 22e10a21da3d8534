// Cross-cutting prompt fragments. Stage-specific prompts live in pipeline::prompts.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Schema every generated posting must follow.
pub const JOB_BODY_SCHEMA: &str = r#"{
  "job_description": "string",
  "requirements": ["string"],
  "benefits": ["string"],
  "duties": ["string"],
  "summary": "string or null"
}"#;
