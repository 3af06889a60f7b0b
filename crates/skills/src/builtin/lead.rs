use async_trait::async_trait;
use serde_json::{json, Map, Value};

use concierge_core::{normalize_header, ComponentSpec, FormField, FunctionResult, Result, Row, ToolName};
use concierge_store::LEADS_TAB;

use super::arg_str;
use crate::context::ToolContext;
use crate::tool::BusinessTool;
use crate::validation::{FieldKind, FieldSpec};

/// Columns appended when the lead tab has no header row yet.
const DEFAULT_HEADERS: &[&str] = &["Timestamp", "Name", "Email", "Phone", "Interest", "Message"];

/// What a lead tab column holds.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LeadColumn {
    Argument(&'static str),
    Timestamp,
    Source,
    Other,
}

fn classify(header: &str) -> LeadColumn {
    let h = normalize_header(header);
    if h.contains("email") {
        LeadColumn::Argument("email")
    } else if h.contains("phone") || h.contains("mobile") || h == "tel" || h.contains("telephone") {
        LeadColumn::Argument("phone")
    } else if h.contains("name") {
        LeadColumn::Argument("name")
    } else if h.contains("interest") || h == "service" || h == "topic" {
        LeadColumn::Argument("interest")
    } else if h.contains("message") || h.contains("note") || h.contains("comment") {
        LeadColumn::Argument("message")
    } else if h.contains("timestamp") || h.contains("date") || h.contains("created") || h.contains("submitted") || h == "time" {
        LeadColumn::Timestamp
    } else if h == "source" || h == "channel" {
        LeadColumn::Source
    } else {
        LeadColumn::Other
    }
}

/// Form input for a lead column. Email and phone are either/or, so neither
/// is marked required on its own.
fn form_field(header: &str) -> Option<FormField> {
    let field = match classify(header) {
        LeadColumn::Argument("name") => FormField::new("name", header, "text").required(),
        LeadColumn::Argument("email") => FormField::new("email", header, "email"),
        LeadColumn::Argument("phone") => FormField::new("phone", header, "tel"),
        LeadColumn::Argument("message") => FormField::new("message", header, "textarea"),
        LeadColumn::Argument(arg) => FormField::new(arg, header, "text"),
        LeadColumn::Other => FormField::new(normalize_header(header), header, "text"),
        LeadColumn::Timestamp | LeadColumn::Source => return None,
    };
    Some(field)
}

/// Records a prospective customer's contact details in the lead tab.
pub struct CaptureLeadTool;

#[async_trait]
impl BusinessTool for CaptureLeadTool {
    fn name(&self) -> ToolName {
        ToolName::CaptureLead
    }

    fn description(&self) -> &'static str {
        "Save a customer's contact details so the business can follow up. Needs a name and an email or phone."
    }

    fn specs(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::optional("name", FieldKind::String, "Customer's name"),
            FieldSpec::optional("email", FieldKind::Email, "Customer's email address"),
            FieldSpec::optional("phone", FieldKind::Phone, "Customer's phone number"),
            FieldSpec::optional("interest", FieldKind::String, "Service or product they are interested in"),
            FieldSpec::optional("message", FieldKind::String, "Anything else they want to tell the business"),
        ]
    }

    async fn execute(&self, ctx: &ToolContext, args: Map<String, Value>) -> Result<FunctionResult> {
        let Some((tab, contents)) = ctx.tabs.fetch_logical(&ctx.store_id, LEADS_TAB).await? else {
            return Ok(FunctionResult::unavailable(
                "This business isn't set up to take contact details through chat yet.",
            ));
        };
        let headers: Vec<String> = if contents.headers.is_empty() {
            DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect()
        } else {
            contents.headers
        };

        let name = arg_str(&args, "name");
        let has_contact = arg_str(&args, "email").is_some() || arg_str(&args, "phone").is_some();
        if name.is_none() || !has_contact {
            let fields: Vec<FormField> = headers.iter().filter_map(|h| form_field(h)).collect();
            return Ok(FunctionResult::awaiting(
                "I'd be happy to have someone get back to you. Could you share your name and an email or phone number?",
                ComponentSpec::LeadForm {
                    title: "Leave your details".into(),
                    fields,
                },
            )
            .verbatim());
        }

        let timestamp = ctx.now.format("%Y-%m-%d %H:%M:%S").to_string();
        let mut row = Row::new();
        for header in &headers {
            let value = match classify(header) {
                LeadColumn::Argument(arg) => args.get(arg).cloned().unwrap_or_else(|| json!("")),
                LeadColumn::Timestamp => json!(timestamp),
                LeadColumn::Source => json!("chat"),
                LeadColumn::Other => json!(""),
            };
            row.insert(header.clone(), value);
        }
        ctx.tabs.append_row(&ctx.store_id, &tab, row).await?;

        let name = name.unwrap_or_default();
        Ok(FunctionResult::ok(json!({
            "name": name,
            "email": arg_str(&args, "email"),
            "phone": arg_str(&args, "phone"),
            "interest": arg_str(&args, "interest"),
        }))
        .with_message(format!(
            "Thanks, {}! We've passed your details on and someone will be in touch soon.",
            name
        ))
        .verbatim())
    }
}
