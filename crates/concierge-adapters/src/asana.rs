//! Asana adapter.
//!
//! Wraps the Asana REST API (`https://app.asana.com/api/1.0`) behind the
//! [`Adapter`] trait: task listing, creation and patch-style updates,
//! search, projects, sections, comments, tags, and assignment. Asana wraps
//! every payload in a `{"data": ...}` envelope, which the shared client
//! strips. Credentials come from `ASANA_ACCESS_TOKEN`; a default workspace
//! may be supplied through `ASANA_DEFAULT_WORKSPACE_GID`.

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{Value, json};

use concierge_core::error::{AdapterError, Result};
use concierge_core::format::{self, ResponseFormat};
use concierge_core::http::{Envelope, RestClient};
use concierge_core::params::ParamReader;
use concierge_core::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition,
};

const API_BASE_URL: &str = "https://app.asana.com/api/1.0";
const TOKEN_ENV: &str = "ASANA_ACCESS_TOKEN";
const DEFAULT_WORKSPACE_ENV: &str = "ASANA_DEFAULT_WORKSPACE_GID";

const TASK_FIELDS: &str =
    "name,notes,completed,completed_at,due_on,assignee.name,projects.name,tags.name";
const TASK_DETAIL_FIELDS: &str = "name,notes,completed,completed_at,created_at,modified_at,\
                                  due_on,assignee.name,projects.name,tags.name,parent.name,followers.name";

pub struct AsanaAdapter {
    id: String,
    client: RestClient,
}

impl AsanaAdapter {
    pub fn new() -> Self {
        Self {
            id: "asana".to_string(),
            client: RestClient::new(API_BASE_URL, Some(TOKEN_ENV), Envelope::Data),
        }
    }

    fn require_workspace(workspace_gid: Option<String>) -> Result<String> {
        workspace_gid.ok_or_else(|| {
            AdapterError::Config(format!(
                "workspace_gid is required. Set {DEFAULT_WORKSPACE_ENV} or provide it explicitly."
            ))
        })
    }

    // -----------------------------------------------------------------------
    // Task listing and search
    // -----------------------------------------------------------------------

    async fn tool_list_tasks(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let workspace_gid = reader.str_or_env("workspace_gid", DEFAULT_WORKSPACE_ENV);
        let assignee = reader.str_or("assignee", "me");
        let project_gid = reader.optional_str("project_gid");
        let completed_since = reader.optional_str("completed_since");
        let limit = reader.int_in_range("limit", 50, 1, 100);
        let response_format = reader.response_format();
        reader.finish("asana_list_tasks")?;

        let mut query = vec![
            ("opt_fields", TASK_FIELDS.to_string()),
            ("limit", limit.to_string()),
            ("assignee", assignee),
        ];
        if let Some(since) = completed_since {
            query.push(("completed_since", since));
        }

        let endpoint = match (&project_gid, &workspace_gid) {
            (Some(project), _) => format!("projects/{project}/tasks"),
            (None, Some(workspace)) => format!("workspaces/{workspace}/tasks/search"),
            (None, None) => "tasks".to_string(),
        };

        let data = self.client.get(&endpoint, &query).await?;
        let tasks = into_list(data);
        if tasks.is_empty() {
            return Ok("No tasks found.".to_string());
        }
        Ok(render_task_listing(&tasks, response_format, "My Tasks", "tasks"))
    }

    async fn tool_search_tasks(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let workspace_gid = reader.str_or_env("workspace_gid", DEFAULT_WORKSPACE_ENV);
        let text = reader.optional_str("text");
        let assignee = reader.optional_str("assignee");
        let projects = reader.optional_str_list("projects", 10);
        let completed = reader.optional_bool("completed");
        let limit = reader.int_in_range("limit", 50, 1, 100);
        let response_format = reader.response_format();
        reader.finish("asana_search_tasks")?;

        let workspace = Self::require_workspace(workspace_gid)?;

        let mut query = vec![
            ("opt_fields", "name,notes,completed,due_on,assignee.name,projects.name".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(text) = text {
            query.push(("text", text));
        }
        if let Some(assignee) = assignee {
            query.push(("assignee.any", assignee));
        }
        if let Some(projects) = projects {
            query.push(("projects.any", projects.join(",")));
        }
        if let Some(completed) = completed {
            query.push(("completed", completed.to_string()));
        }

        let data = self
            .client
            .get(&format!("workspaces/{workspace}/tasks/search"), &query)
            .await?;
        let tasks = into_list(data);
        if tasks.is_empty() {
            return Ok("No tasks found matching search criteria.".to_string());
        }
        Ok(render_task_listing(&tasks, response_format, "Search Results", "results"))
    }

    async fn tool_get_project_tasks(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let project_gid = reader.required_str("project_gid");
        let limit = reader.int_in_range("limit", 50, 1, 100);
        let response_format = reader.response_format();
        reader.finish("asana_get_project_tasks")?;
        let project = project_gid.unwrap_or_default();

        let query = vec![
            ("opt_fields", "name,completed,due_on,assignee.name".to_string()),
            ("limit", limit.to_string()),
        ];
        let data = self
            .client
            .get(&format!("projects/{project}/tasks"), &query)
            .await?;
        let tasks = into_list(data);
        if tasks.is_empty() {
            return Ok("No tasks found in this project.".to_string());
        }
        Ok(render_task_listing(&tasks, response_format, "Project Tasks", "tasks"))
    }

    // -----------------------------------------------------------------------
    // Task mutation
    // -----------------------------------------------------------------------

    async fn tool_create_task(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let name = reader.required_str_bounded("name", 1, 1024);
        let notes = reader.optional_str_bounded("notes", 65_536);
        let workspace_gid = reader.str_or_env("workspace_gid", DEFAULT_WORKSPACE_ENV);
        let project_gid = reader.optional_str("project_gid");
        let assignee = reader.optional_str("assignee");
        let due_on = reader.optional_str("due_on");
        let parent = reader.optional_str("parent");
        reader.finish("asana_create_task")?;

        let mut body = json!({"data": {"name": name}});
        let data = &mut body["data"];
        if let Some(notes) = notes {
            data["notes"] = json!(notes);
        }
        if let Some(workspace) = workspace_gid {
            data["workspace"] = json!(workspace);
        }
        if let Some(project) = project_gid {
            data["projects"] = json!([project]);
        }
        if let Some(assignee) = assignee {
            data["assignee"] = json!(assignee);
        }
        if let Some(due_on) = due_on {
            data["due_on"] = json!(due_on);
        }
        if let Some(parent) = parent {
            data["parent"] = json!(parent);
        }

        let task = self.client.post("tasks", &body).await?;

        let mut lines = vec![
            "# Task Created Successfully".to_string(),
            String::new(),
            format!("**Task ID**: `{}`", str_field(&task, "gid")),
            format!("**Name**: {}", str_field(&task, "name")),
        ];
        if let Some(due_on) = task.get("due_on").and_then(Value::as_str) {
            lines.push(format!("**Due**: {due_on}"));
        }
        if let Some(assignee) = task.get("assignee").and_then(|a| a.get("name")).and_then(Value::as_str) {
            lines.push(format!("**Assigned to**: {assignee}"));
        }
        Ok(lines.join("\n"))
    }

    async fn tool_update_task(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let task_gid = reader.required_str("task_gid");
        let name = reader.optional_str_bounded("name", 1024);
        let notes = reader.optional_str_bounded("notes", 65_536);
        let assignee = reader.optional_str("assignee");
        let due_on = reader.optional_str("due_on");
        let completed = reader.optional_bool("completed");

        let patch = build_task_patch(&name, &notes, &assignee, &due_on, completed);
        if patch.as_object().is_some_and(|m| m.is_empty()) {
            reader.violation("fields", "at least one field to update must be provided");
        }
        reader.finish("asana_update_task")?;
        let task_gid = task_gid.unwrap_or_default();

        let task = self
            .client
            .put(&format!("tasks/{task_gid}"), &json!({"data": patch}))
            .await?;

        let status = if task.get("completed").and_then(Value::as_bool).unwrap_or(false) {
            "✅ Completed"
        } else {
            "⭕ Incomplete"
        };
        Ok([
            "# Task Updated Successfully".to_string(),
            String::new(),
            format!("**Task ID**: `{}`", str_field(&task, "gid")),
            format!("**Name**: {}", str_field(&task, "name")),
            format!("**Status**: {status}"),
        ]
        .join("\n"))
    }

    async fn tool_complete_task(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let task_gid = reader.required_str("task_gid");
        reader.finish("asana_complete_task")?;
        let task_gid = task_gid.unwrap_or_default();

        let body = json!({"data": {"completed": true}});
        let task = self.client.put(&format!("tasks/{task_gid}"), &body).await?;
        Ok(format!("✅ Task '{}' marked as completed!", str_field(&task, "name")))
    }

    async fn tool_set_due_date(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let task_gid = reader.required_str("task_gid");
        let due_on = reader.required_str("due_on");
        reader.finish("asana_set_due_date")?;
        let (task_gid, due_on) = (task_gid.unwrap_or_default(), due_on.unwrap_or_default());

        let body = json!({"data": {"due_on": due_on}});
        let task = self.client.put(&format!("tasks/{task_gid}"), &body).await?;
        Ok(format!(
            "✅ Due date set to {due_on} for task '{}'",
            str_field(&task, "name")
        ))
    }

    async fn tool_assign_task(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let task_gid = reader.required_str("task_gid");
        let assignee = reader.required_str("assignee");
        reader.finish("asana_assign_task")?;
        let (task_gid, assignee) = (task_gid.unwrap_or_default(), assignee.unwrap_or_default());

        let body = json!({"data": {"assignee": assignee}});
        let task = self.client.put(&format!("tasks/{task_gid}"), &body).await?;
        let assignee_name = task
            .get("assignee")
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("user");
        Ok(format!(
            "✅ Task '{}' assigned to {assignee_name}",
            str_field(&task, "name")
        ))
    }

    async fn tool_add_subtask(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let parent_task_gid = reader.required_str("parent_task_gid");
        let name = reader.required_str_bounded("name", 1, 1024);
        let notes = reader.optional_str_bounded("notes", 65_536);
        let assignee = reader.optional_str("assignee");
        reader.finish("asana_add_subtask")?;

        let mut body = json!({"data": {
            "name": name,
            "parent": parent_task_gid,
        }});
        if let Some(notes) = notes {
            body["data"]["notes"] = json!(notes);
        }
        if let Some(assignee) = assignee {
            body["data"]["assignee"] = json!(assignee);
        }

        let subtask = self.client.post("tasks", &body).await?;
        Ok(format!(
            "✅ Subtask '{}' created (ID: {})",
            str_field(&subtask, "name"),
            str_field(&subtask, "gid")
        ))
    }

    // -----------------------------------------------------------------------
    // Task inspection
    // -----------------------------------------------------------------------

    async fn tool_get_task_details(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let task_gid = reader.required_str("task_gid");
        reader.finish("asana_get_task_details")?;
        let task_gid = task_gid.unwrap_or_default();

        let query = vec![("opt_fields", TASK_DETAIL_FIELDS.to_string())];
        let task = self.client.get(&format!("tasks/{task_gid}"), &query).await?;

        let mut lines = vec![
            "# Task Details".to_string(),
            String::new(),
            format!("## {}", str_field(&task, "name")),
            format!("**ID**: `{}`", str_field(&task, "gid")),
            String::new(),
        ];
        if let Some(assignee) = task.get("assignee").and_then(|a| a.get("name")).and_then(Value::as_str) {
            lines.push(format!("**Assigned to**: {assignee}"));
        }
        if let Some(due_on) = task.get("due_on").and_then(Value::as_str) {
            lines.push(format!("**Due**: {due_on}"));
        }
        let completed = task.get("completed").and_then(Value::as_bool).unwrap_or(false);
        lines.push(format!(
            "**Status**: {}",
            if completed { "✅ Completed" } else { "⭕ Incomplete" }
        ));
        if let Some(completed_at) = task.get("completed_at").and_then(Value::as_str) {
            lines.push(format!("**Completed**: {completed_at}"));
        }
        lines.push(format!("**Created**: {}", str_field(&task, "created_at")));
        lines.push(format!("**Modified**: {}", str_field(&task, "modified_at")));
        if let Some(parent) = task.get("parent").and_then(|p| p.get("name")).and_then(Value::as_str) {
            lines.push(format!("**Parent Task**: {parent}"));
        }
        if let Some(names) = name_list(&task, "projects", usize::MAX) {
            lines.push(format!("**Projects**: {names}"));
        }
        if let Some(names) = name_list(&task, "tags", usize::MAX) {
            lines.push(format!("**Tags**: {names}"));
        }
        if let Some(names) = name_list(&task, "followers", 5) {
            lines.push(format!("**Followers**: {names}"));
        }
        if let Some(notes) = task.get("notes").and_then(Value::as_str).filter(|n| !n.is_empty()) {
            lines.push(String::new());
            lines.push("**Notes**:".to_string());
            lines.push(notes.to_string());
        }
        Ok(lines.join("\n"))
    }

    async fn tool_get_user_task_list(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let user_gid = reader.str_or("user_gid", "me");
        reader.finish("asana_get_user_task_list")?;

        let data = self
            .client
            .get(&format!("users/{user_gid}/user_task_list"), &[])
            .await?;
        let owner = data
            .get("owner")
            .and_then(|o| o.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        Ok([
            "# User Task List".to_string(),
            String::new(),
            format!("**Task List GID**: `{}`", str_field(&data, "gid")),
            format!(
                "**Name**: {}",
                data.get("name").and_then(Value::as_str).unwrap_or("My Tasks")
            ),
            format!("**Owner**: {owner}"),
            String::new(),
            "💡 **Tip**: Use this GID with `asana_list_sections` to see your My Tasks sections."
                .to_string(),
        ]
        .join("\n"))
    }

    // -----------------------------------------------------------------------
    // Projects, sections, comments, tags
    // -----------------------------------------------------------------------

    async fn tool_list_projects(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let workspace_gid = reader.str_or_env("workspace_gid", DEFAULT_WORKSPACE_ENV);
        let archived = reader.bool_or("archived", false);
        let limit = reader.int_in_range("limit", 50, 1, 100);
        let response_format = reader.response_format();
        reader.finish("asana_list_projects")?;

        let workspace = Self::require_workspace(workspace_gid)?;

        let query = vec![
            ("workspace", workspace),
            ("archived", archived.to_string()),
            ("opt_fields", "name,archived,created_at,modified_at,owner.name".to_string()),
            ("limit", limit.to_string()),
        ];
        let data = self.client.get("projects", &query).await?;
        let projects = into_list(data);
        if projects.is_empty() {
            return Ok("No projects found.".to_string());
        }

        if response_format.is_json() {
            return Ok(to_json_report("projects", &projects)?);
        }
        let mut lines = vec![
            "# Asana Projects".to_string(),
            String::new(),
            format!("Found {} project(s)", projects.len()),
            String::new(),
        ];
        for project in &projects {
            lines.push(format!("## {}", str_field(project, "name")));
            lines.push(format!("**ID**: `{}`", str_field(project, "gid")));
            if let Some(owner) = project.get("owner").and_then(|o| o.get("name")).and_then(Value::as_str) {
                lines.push(format!("**Owner**: {owner}"));
            }
            if project.get("archived").and_then(Value::as_bool).unwrap_or(false) {
                lines.push("**Status**: 🗄️ Archived".to_string());
            }
            lines.push(String::new());
        }
        Ok(lines.join("\n"))
    }

    async fn tool_list_sections(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let project_gid = reader.required_str("project_gid");
        reader.int_in_range("limit", 50, 1, 100);
        let response_format = reader.response_format();
        reader.finish("asana_list_sections")?;
        let project_gid = project_gid.unwrap_or_default();

        // User Task Lists answer this endpoint too, so My Tasks sections
        // come through the same path.
        let data = self
            .client
            .get(&format!("projects/{project_gid}/sections"), &[])
            .await?;
        let sections = into_list(data);
        if sections.is_empty() {
            return Ok("No sections found.".to_string());
        }

        if response_format.is_json() {
            return Ok(to_json_report("sections", &sections)?);
        }
        let mut lines = vec![
            "# Sections".to_string(),
            String::new(),
            format!("Found {} section(s)", sections.len()),
            String::new(),
        ];
        for section in &sections {
            lines.push(format!("## {}", str_field(section, "name")));
            lines.push(format!("**ID**: `{}`", str_field(section, "gid")));
            lines.push(String::new());
        }
        Ok(lines.join("\n"))
    }

    async fn tool_move_task_to_section(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let task_gid = reader.required_str("task_gid");
        let section_gid = reader.required_str("section_gid");
        reader.finish("asana_move_task_to_section")?;
        let (task_gid, section_gid) = (task_gid.unwrap_or_default(), section_gid.unwrap_or_default());

        let body = json!({"data": {"task": task_gid}});
        self.client
            .post(&format!("sections/{section_gid}/addTask"), &body)
            .await?;
        Ok("✅ Task moved to section successfully!".to_string())
    }

    async fn tool_add_comment(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let task_gid = reader.required_str("task_gid");
        let text = reader.required_str_bounded("text", 1, 65_536);
        reader.finish("asana_add_comment")?;
        let task_gid = task_gid.unwrap_or_default();

        let body = json!({"data": {"text": text}});
        self.client
            .post(&format!("tasks/{task_gid}/stories"), &body)
            .await?;
        Ok("✅ Comment added to task successfully!".to_string())
    }

    async fn tool_get_task_comments(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let task_gid = reader.required_str("task_gid");
        reader.finish("asana_get_task_comments")?;
        let task_gid = task_gid.unwrap_or_default();

        let query = vec![("opt_fields", "text,created_at,created_by.name,type".to_string())];
        let data = self
            .client
            .get(&format!("tasks/{task_gid}/stories"), &query)
            .await?;

        // Stories include system events; only real comments are shown.
        let comments: Vec<Value> = into_list(data)
            .into_iter()
            .filter(|s| s.get("type").and_then(Value::as_str) == Some("comment"))
            .collect();
        if comments.is_empty() {
            return Ok("No comments found on this task.".to_string());
        }

        let mut lines = vec![
            "# Task Comments".to_string(),
            String::new(),
            format!("Found {} comment(s)", comments.len()),
            String::new(),
        ];
        for comment in &comments {
            let author = comment
                .get("created_by")
                .and_then(|c| c.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown");
            let created_at = comment
                .get("created_at")
                .and_then(Value::as_str)
                .map(format_timestamp)
                .unwrap_or_else(|| "Unknown time".to_string());
            let text = comment.get("text").and_then(Value::as_str).unwrap_or("(No text)");
            lines.push(format!("## 💬 {author} - {created_at}"));
            lines.push(text.to_string());
            lines.push(String::new());
        }
        Ok(lines.join("\n"))
    }

    async fn tool_list_tags(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let workspace_gid = reader.str_or_env("workspace_gid", DEFAULT_WORKSPACE_ENV);
        let response_format = reader.response_format();
        reader.finish("asana_list_tags")?;

        let workspace = Self::require_workspace(workspace_gid)?;

        let data = self.client.get("tags", &[("workspace", workspace)]).await?;
        let tags = into_list(data);
        if tags.is_empty() {
            return Ok("No tags found in this workspace.".to_string());
        }

        if response_format.is_json() {
            return Ok(to_json_report("tags", &tags)?);
        }
        let mut lines = vec![
            "# Workspace Tags".to_string(),
            String::new(),
            format!("Found {} tag(s)", tags.len()),
            String::new(),
        ];
        for tag in &tags {
            lines.push(format!(
                "- **{}** (`{}`)",
                str_field(tag, "name"),
                str_field(tag, "gid")
            ));
        }
        Ok(lines.join("\n"))
    }

    async fn tool_add_tag_to_task(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let task_gid = reader.required_str("task_gid");
        let tag_gid = reader.required_str("tag_gid");
        reader.finish("asana_add_tag_to_task")?;
        let (task_gid, tag_gid) = (task_gid.unwrap_or_default(), tag_gid.unwrap_or_default());

        let body = json!({"data": {"tag": tag_gid}});
        self.client
            .post(&format!("tasks/{task_gid}/addTag"), &body)
            .await?;
        Ok("✅ Tag added to task successfully!".to_string())
    }
}

impl Default for AsanaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Rendering helpers
// ---------------------------------------------------------------------------

fn into_list(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or("Unknown")
}

fn name_list(value: &Value, field: &str, max: usize) -> Option<String> {
    let items = value.get(field)?.as_array()?;
    if items.is_empty() {
        return None;
    }
    let names: Vec<&str> = items
        .iter()
        .take(max)
        .map(|item| item.get("name").and_then(Value::as_str).unwrap_or("Unknown"))
        .collect();
    Some(names.join(", "))
}

fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn build_task_patch(
    name: &Option<String>,
    notes: &Option<String>,
    assignee: &Option<String>,
    due_on: &Option<String>,
    completed: Option<bool>,
) -> Value {
    let mut patch = serde_json::Map::new();
    if let Some(name) = name {
        patch.insert("name".to_string(), json!(name));
    }
    if let Some(notes) = notes {
        patch.insert("notes".to_string(), json!(notes));
    }
    if let Some(assignee) = assignee {
        patch.insert("assignee".to_string(), json!(assignee));
    }
    if let Some(due_on) = due_on {
        patch.insert("due_on".to_string(), json!(due_on));
    }
    if let Some(completed) = completed {
        patch.insert("completed".to_string(), json!(completed));
    }
    Value::Object(patch)
}

fn format_task_markdown(task: &Value) -> String {
    let mut lines = Vec::new();
    let name = task.get("name").and_then(Value::as_str).unwrap_or("(No name)");
    let completed = task.get("completed").and_then(Value::as_bool).unwrap_or(false);
    let status_icon = if completed { "✅" } else { "⭕" };
    lines.push(format!("## {status_icon} {name}"));
    lines.push(format!("**ID**: `{}`", str_field(task, "gid")));

    match task.get("assignee").and_then(|a| a.get("name")).and_then(Value::as_str) {
        Some(assignee) => lines.push(format!("**Assigned to**: {assignee}")),
        None => lines.push("**Assigned to**: Unassigned".to_string()),
    }
    if let Some(due_on) = task.get("due_on").and_then(Value::as_str) {
        lines.push(format!("**Due**: {due_on}"));
    }
    if completed {
        let completed_at = task.get("completed_at").and_then(Value::as_str).unwrap_or("Unknown");
        lines.push(format!("**Completed**: {completed_at}"));
    }
    if let Some(notes) = task.get("notes").and_then(Value::as_str) {
        if !notes.trim().is_empty() {
            lines.push(format!("**Notes**: {}", format::preview(notes, 200)));
        }
    }
    if let Some(names) = name_list(task, "projects", 3) {
        lines.push(format!("**Projects**: {names}"));
    }
    if let Some(names) = name_list(task, "tags", 5) {
        lines.push(format!("**Tags**: {names}"));
    }
    lines.push(String::new());
    lines.join("\n")
}

fn render_tasks(tasks: &[Value], response_format: ResponseFormat, title: &str) -> String {
    if response_format.is_json() {
        return to_json_report("tasks", tasks).unwrap_or_default();
    }
    let mut lines = vec![
        format!("# {title}"),
        String::new(),
        format!("Found {} task(s)", tasks.len()),
        String::new(),
    ];
    if tasks.is_empty() {
        lines.push("No tasks found.".to_string());
    } else {
        for task in tasks {
            lines.push(format_task_markdown(task));
        }
    }
    lines.join("\n")
}

fn render_task_listing(
    tasks: &[Value],
    response_format: ResponseFormat,
    title: &str,
    noun_plural: &str,
) -> String {
    format::shrink_listing(
        tasks,
        |slice, truncated| {
            let title = if truncated {
                format!("{title} (Truncated)")
            } else {
                title.to_string()
            };
            render_tasks(slice, response_format, &title)
        },
        |kept, total| format!("\n\n**Note**: Showing {kept} of {total} {noun_plural}."),
    )
}

fn to_json_report(plural: &str, items: &[Value]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&json!({
        "count": items.len(),
        plural: items,
    }))?)
}

// ---------------------------------------------------------------------------
// Adapter impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for AsanaAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Productivity
    }

    fn health_check(&self) -> HealthStatus {
        if self.client.bearer_token().is_ok() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        let response_format = json!({
            "type": "string",
            "enum": ["markdown", "json"],
            "description": "Output format: 'markdown' or 'json'",
            "default": "markdown"
        });
        let limit = json!({
            "type": "integer",
            "description": "Maximum number of results",
            "minimum": 1,
            "maximum": 100,
            "default": 50
        });
        vec![
            ToolDefinition {
                name: "asana_list_tasks".to_string(),
                description: "List tasks from an Asana workspace or project, filtered by assignee or completion date".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "workspace_gid": {"type": "string", "description": "Workspace GID (defaults to ASANA_DEFAULT_WORKSPACE_GID)"},
                        "assignee": {"type": "string", "description": "User GID to filter by assignee, 'me' for your tasks", "default": "me"},
                        "project_gid": {"type": "string", "description": "Project GID to filter tasks by project"},
                        "completed_since": {"type": "string", "description": "ISO 8601 date to get completed tasks since"},
                        "limit": limit,
                        "response_format": response_format
                    }
                }),
            },
            ToolDefinition {
                name: "asana_create_task".to_string(),
                description: "Create a new task, optionally assigned, dated, in a project, or as a subtask".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "Task name", "minLength": 1, "maxLength": 1024},
                        "notes": {"type": "string", "description": "Task description", "maxLength": 65536},
                        "workspace_gid": {"type": "string", "description": "Workspace GID (defaults to ASANA_DEFAULT_WORKSPACE_GID)"},
                        "project_gid": {"type": "string", "description": "Project GID to add the task to"},
                        "assignee": {"type": "string", "description": "User GID to assign to, 'me' for yourself"},
                        "due_on": {"type": "string", "description": "Due date in YYYY-MM-DD format"},
                        "parent": {"type": "string", "description": "Parent task GID (creates a subtask)"}
                    },
                    "required": ["name"]
                }),
            },
            ToolDefinition {
                name: "asana_update_task".to_string(),
                description: "Update an existing task with patch semantics; only supplied fields change".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "task_gid": {"type": "string", "description": "Task GID to update"},
                        "name": {"type": "string", "description": "New task name", "maxLength": 1024},
                        "notes": {"type": "string", "description": "New task notes", "maxLength": 65536},
                        "assignee": {"type": "string", "description": "New assignee GID, 'me' for yourself"},
                        "due_on": {"type": "string", "description": "New due date in YYYY-MM-DD format"},
                        "completed": {"type": "boolean", "description": "Mark completed (true) or incomplete (false)"}
                    },
                    "required": ["task_gid"]
                }),
            },
            ToolDefinition {
                name: "asana_complete_task".to_string(),
                description: "Mark a task as completed".to_string(),
                parameters: task_gid_schema(),
            },
            ToolDefinition {
                name: "asana_search_tasks".to_string(),
                description: "Search tasks in a workspace by text, assignee, projects, or completion".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "workspace_gid": {"type": "string", "description": "Workspace GID (defaults to ASANA_DEFAULT_WORKSPACE_GID)"},
                        "text": {"type": "string", "description": "Text to search in task names and notes"},
                        "assignee": {"type": "string", "description": "Filter by assignee GID"},
                        "projects": {"type": "array", "items": {"type": "string"}, "maxItems": 10, "description": "Project GIDs to filter by"},
                        "completed": {"type": "boolean", "description": "Filter by completion status"},
                        "limit": limit,
                        "response_format": response_format
                    }
                }),
            },
            ToolDefinition {
                name: "asana_list_projects".to_string(),
                description: "List projects in a workspace".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "workspace_gid": {"type": "string", "description": "Workspace GID (defaults to ASANA_DEFAULT_WORKSPACE_GID)"},
                        "archived": {"type": "boolean", "description": "Include archived projects", "default": false},
                        "limit": limit,
                        "response_format": response_format
                    }
                }),
            },
            ToolDefinition {
                name: "asana_get_project_tasks".to_string(),
                description: "Get all tasks in a specific project".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "project_gid": {"type": "string", "description": "Project GID"},
                        "limit": limit,
                        "response_format": response_format
                    },
                    "required": ["project_gid"]
                }),
            },
            ToolDefinition {
                name: "asana_add_comment".to_string(),
                description: "Add a comment to a task".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "task_gid": {"type": "string", "description": "Task GID to comment on"},
                        "text": {"type": "string", "description": "Comment text", "minLength": 1, "maxLength": 65536}
                    },
                    "required": ["task_gid", "text"]
                }),
            },
            ToolDefinition {
                name: "asana_get_task_comments".to_string(),
                description: "Get the comment history of a task with authors and timestamps".to_string(),
                parameters: task_gid_schema(),
            },
            ToolDefinition {
                name: "asana_list_sections".to_string(),
                description: "List sections in a project or a User Task List (My Tasks)".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "project_gid": {"type": "string", "description": "Project GID or User Task List GID"},
                        "limit": limit,
                        "response_format": response_format
                    },
                    "required": ["project_gid"]
                }),
            },
            ToolDefinition {
                name: "asana_move_task_to_section".to_string(),
                description: "Move a task into a section of a project".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "task_gid": {"type": "string", "description": "Task GID"},
                        "section_gid": {"type": "string", "description": "Section GID"}
                    },
                    "required": ["task_gid", "section_gid"]
                }),
            },
            ToolDefinition {
                name: "asana_add_subtask".to_string(),
                description: "Add a subtask to an existing task".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "parent_task_gid": {"type": "string", "description": "Parent task GID"},
                        "name": {"type": "string", "description": "Subtask name", "minLength": 1, "maxLength": 1024},
                        "notes": {"type": "string", "description": "Subtask notes", "maxLength": 65536},
                        "assignee": {"type": "string", "description": "Assignee GID"}
                    },
                    "required": ["parent_task_gid", "name"]
                }),
            },
            ToolDefinition {
                name: "asana_get_task_details".to_string(),
                description: "Get complete details for a task, including notes, projects, tags, and followers".to_string(),
                parameters: task_gid_schema(),
            },
            ToolDefinition {
                name: "asana_list_tags".to_string(),
                description: "List all tags in a workspace".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "workspace_gid": {"type": "string", "description": "Workspace GID (defaults to ASANA_DEFAULT_WORKSPACE_GID)"},
                        "response_format": response_format
                    }
                }),
            },
            ToolDefinition {
                name: "asana_add_tag_to_task".to_string(),
                description: "Add a tag to a task".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "task_gid": {"type": "string", "description": "Task GID"},
                        "tag_gid": {"type": "string", "description": "Tag GID"}
                    },
                    "required": ["task_gid", "tag_gid"]
                }),
            },
            ToolDefinition {
                name: "asana_set_due_date".to_string(),
                description: "Set or update the due date of a task".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "task_gid": {"type": "string", "description": "Task GID"},
                        "due_on": {"type": "string", "description": "Due date in YYYY-MM-DD format"}
                    },
                    "required": ["task_gid", "due_on"]
                }),
            },
            ToolDefinition {
                name: "asana_assign_task".to_string(),
                description: "Assign a task to a user".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "task_gid": {"type": "string", "description": "Task GID"},
                        "assignee": {"type": "string", "description": "User GID, 'me' for yourself"}
                    },
                    "required": ["task_gid", "assignee"]
                }),
            },
            ToolDefinition {
                name: "asana_get_user_task_list".to_string(),
                description: "Get the User Task List (My Tasks) GID for a user".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "user_gid": {"type": "string", "description": "User GID, 'me' for yourself", "default": "me"}
                    }
                }),
            },
        ]
    }

    async fn execute_tool(&self, name: &str, params: Value) -> Result<String> {
        match name {
            "asana_list_tasks" => self.tool_list_tasks(params).await,
            "asana_create_task" => self.tool_create_task(params).await,
            "asana_update_task" => self.tool_update_task(params).await,
            "asana_complete_task" => self.tool_complete_task(params).await,
            "asana_search_tasks" => self.tool_search_tasks(params).await,
            "asana_list_projects" => self.tool_list_projects(params).await,
            "asana_get_project_tasks" => self.tool_get_project_tasks(params).await,
            "asana_add_comment" => self.tool_add_comment(params).await,
            "asana_get_task_comments" => self.tool_get_task_comments(params).await,
            "asana_list_sections" => self.tool_list_sections(params).await,
            "asana_move_task_to_section" => self.tool_move_task_to_section(params).await,
            "asana_add_subtask" => self.tool_add_subtask(params).await,
            "asana_get_task_details" => self.tool_get_task_details(params).await,
            "asana_list_tags" => self.tool_list_tags(params).await,
            "asana_add_tag_to_task" => self.tool_add_tag_to_task(params).await,
            "asana_set_due_date" => self.tool_set_due_date(params).await,
            "asana_assign_task" => self.tool_assign_task(params).await,
            "asana_get_user_task_list" => self.tool_get_user_task_list(params).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "asana".to_string(),
            env_var: TOKEN_ENV.to_string(),
        })
    }
}

fn task_gid_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "task_gid": {"type": "string", "description": "Task GID"}
        },
        "required": ["task_gid"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_markdown_includes_status_and_assignee() {
        let task = json!({
            "gid": "123",
            "name": "Review Q4 Budget",
            "completed": false,
            "assignee": {"name": "Dana"},
            "due_on": "2025-03-01",
            "notes": "Quarterly review",
            "projects": [{"name": "Finance"}],
            "tags": [{"name": "urgent"}]
        });
        let md = format_task_markdown(&task);
        assert!(md.starts_with("## ⭕ Review Q4 Budget"));
        assert!(md.contains("**ID**: `123`"));
        assert!(md.contains("**Assigned to**: Dana"));
        assert!(md.contains("**Due**: 2025-03-01"));
        assert!(md.contains("**Projects**: Finance"));
        assert!(md.contains("**Tags**: urgent"));
    }

    #[test]
    fn unassigned_task_says_unassigned() {
        let task = json!({"gid": "1", "name": "Solo", "completed": true, "completed_at": "2025-01-05"});
        let md = format_task_markdown(&task);
        assert!(md.contains("## ✅ Solo"));
        assert!(md.contains("**Assigned to**: Unassigned"));
        assert!(md.contains("**Completed**: 2025-01-05"));
    }

    #[test]
    fn long_notes_are_previewed() {
        let task = json!({"gid": "1", "name": "T", "notes": "x".repeat(300)});
        let md = format_task_markdown(&task);
        assert!(md.contains(&format!("**Notes**: {}...", "x".repeat(200))));
    }

    #[test]
    fn project_and_tag_lists_are_capped() {
        let projects: Vec<Value> = (0..5).map(|i| json!({"name": format!("P{i}")})).collect();
        let tags: Vec<Value> = (0..8).map(|i| json!({"name": format!("t{i}")})).collect();
        let task = json!({"gid": "1", "name": "T", "projects": projects, "tags": tags});
        let md = format_task_markdown(&task);
        assert!(md.contains("**Projects**: P0, P1, P2\n"));
        assert!(md.contains("**Tags**: t0, t1, t2, t3, t4\n"));
    }

    #[test]
    fn patch_body_contains_only_set_fields() {
        let patch = build_task_patch(&Some("New name".into()), &None, &None, &None, Some(true));
        assert_eq!(patch, json!({"name": "New name", "completed": true}));

        let empty = build_task_patch(&None, &None, &None, &None, None);
        assert_eq!(empty, json!({}));
    }

    #[test]
    fn json_listing_carries_count() {
        let tasks = vec![json!({"gid": "1"}), json!({"gid": "2"})];
        let out = render_task_listing(&tasks, ResponseFormat::Json, "My Tasks", "tasks");
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["count"], 2);
        assert_eq!(parsed["tasks"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn markdown_listing_has_header_and_count() {
        let tasks = vec![json!({"gid": "1", "name": "A"})];
        let out = render_task_listing(&tasks, ResponseFormat::Markdown, "Project Tasks", "tasks");
        assert!(out.starts_with("# Project Tasks\n"));
        assert!(out.contains("Found 1 task(s)"));
    }

    #[test]
    fn oversized_listing_truncates_to_half() {
        let tasks: Vec<Value> = (0..20)
            .map(|i| json!({"gid": i.to_string(), "name": "n".repeat(3000)}))
            .collect();
        let out = render_task_listing(&tasks, ResponseFormat::Markdown, "My Tasks", "tasks");
        assert!(out.contains("# My Tasks (Truncated)"));
        assert!(out.ends_with("**Note**: Showing 10 of 20 tasks."));
    }

    #[test]
    fn comment_timestamps_are_reformatted() {
        assert_eq!(format_timestamp("2025-02-03T14:30:00Z"), "2025-02-03 14:30");
        assert_eq!(format_timestamp("not a date"), "not a date");
    }

    #[test]
    fn story_list_unwraps_nested_data() {
        let nested = json!({"data": [{"gid": "1"}]});
        assert_eq!(into_list(nested).len(), 1);
        let plain = json!([{"gid": "1"}, {"gid": "2"}]);
        assert_eq!(into_list(plain).len(), 2);
    }

    #[tokio::test]
    async fn update_with_no_fields_is_rejected_before_network() {
        let adapter = AsanaAdapter::new();
        let err = adapter
            .execute_tool("asana_update_task", json!({"task_gid": "42"}))
            .await
            .unwrap_err();
        let msg = err.user_message();
        assert!(msg.starts_with("Error: Invalid parameters:"));
        assert!(msg.contains("at least one field to update"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let adapter = AsanaAdapter::new();
        let err = adapter
            .execute_tool("asana_delete_everything", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::ToolNotFound { .. }));
    }

    #[test]
    fn tool_definitions_are_complete() {
        let adapter = AsanaAdapter::new();
        let tools = adapter.tools();
        assert_eq!(tools.len(), 18);
        assert!(tools.iter().all(|t| t.name.starts_with("asana_")));
    }
}
