//! Deterministic replies for tool outcomes that need no model.
//!
//! Rendering is a pure function of the tool, its result and the original
//! arguments. Anything outside the whitelist, or a template that fails to
//! render, yields `None` and the responder takes over.

use serde_json::Value;
use tera::{Context, Tera};

use concierge_core::{FunctionResult, ToolName, ERR_FULLY_BOOKED, ERR_NO_CLASS_SCHEDULED};

const BOOKING_CONFIRMED: &str = "\
You're booked! {{ data.service }} on {{ data.date }} at {{ data.time }}\
{% if data.customer_name %} for {{ data.customer_name }}{% endif %}. \
Your booking reference is {{ data.booking_id }}.\
{% if data.available_spots_remaining == 0 %} You got the last spot!{% endif %}";

const FULLY_BOOKED: &str = "\
Sorry, the {{ data.service }} session at {{ data.time }} on {{ data.date }} is fully booked. \
Would you like me to look for another time?";

const NO_CLASS_SCHEDULED: &str = "\
There's no {{ data.service }} session scheduled at {{ data.time }} on {{ data.date }}. \
Would you like to see the times that are open?";

const AVAILABILITY: &str = "\
{% if data.windows | length == 0 %}\
Nothing is open on {{ data.date }}{% if data.service %} for {{ data.service }}{% endif %}.\
{% else %}\
Here's what's open on {{ data.date }}{% if data.service %} for {{ data.service }}{% endif %}: \
{% for w in data.windows %}{{ w.start }}-{{ w.end }} ({{ w.spots_remaining }} spot{{ w.spots_remaining | pluralize }} left)\
{% if not loop.last %}, {% endif %}{% endfor %}.\
{% endif %}";

const BOOKING_SLOTS: &str = "\
{% if data.count == 0 %}\
There are no open slots for {{ data.service }} in that period.\
{% elif data.count == 1 %}\
There is 1 open slot for {{ data.service }}: {{ data.slots | first }}. Tap it to book.\
{% else %}\
There are {{ data.count }} open slots for {{ data.service }}, starting {{ data.slots | first }}. Pick one below to book.\
{% endif %}";

const LEAD_PROMPT: &str = "\
I'd be happy to have someone get back to you. Could you share your name and an email or phone number?";

const LEAD_CONFIRMED: &str = "\
Thanks{% if data.name %}, {{ data.name }}{% endif %}! We've got your details and someone will be in touch soon.";

const RECOMMEND_INTAKE: &str = "\
Happy to suggest something! What would you like to achieve, and how much experience do you have?";

/// Pick the template for an outcome, if one is whitelisted.
fn select(tool: &ToolName, result: &FunctionResult) -> Option<&'static str> {
    match tool {
        ToolName::CreateBooking if result.success => Some(BOOKING_CONFIRMED),
        ToolName::CreateBooking if result.has_error(ERR_FULLY_BOOKED) => Some(FULLY_BOOKED),
        ToolName::CreateBooking if result.has_error(ERR_NO_CLASS_SCHEDULED) => Some(NO_CLASS_SCHEDULED),
        ToolName::CheckAvailability if result.success => Some(AVAILABILITY),
        ToolName::GetBookingSlots if result.success => Some(BOOKING_SLOTS),
        ToolName::CaptureLead if result.message.is_none() && result.awaiting_input => Some(LEAD_PROMPT),
        ToolName::CaptureLead if result.message.is_none() && result.success => Some(LEAD_CONFIRMED),
        ToolName::RecommendServices if result.awaiting_input => Some(RECOMMEND_INTAKE),
        _ => None,
    }
}

/// Render a deterministic reply for a tool outcome.
pub fn render(tool: &ToolName, result: &FunctionResult, args: &Value) -> Option<String> {
    let template = select(tool, result)?;

    let mut context = Context::new();
    context.insert("data", result.data.as_ref().unwrap_or(&Value::Null));
    context.insert("args", args);
    context.insert("message", &result.message);
    context.insert("error", &result.error);

    match Tera::one_off(template, &context, false) {
        Ok(text) => {
            let text = text.trim().to_string();
            (!text.is_empty()).then_some(text)
        }
        Err(e) => {
            tracing::warn!(tool = %tool, error = %e, "Template rendering failed, falling back to responder");
            None
        }
    }
}
