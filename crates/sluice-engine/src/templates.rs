//! The template pool simulated items are drawn from.

use std::path::Path;

use rand::seq::SliceRandom as _;
use serde_json::{Value, json};
use sluice_core::item::{Payload, Template};

use crate::{Error, Result};

/// A non-empty set of templates with uniform random selection.
#[derive(Debug, Clone)]
pub struct TemplatePool {
  templates: Vec<Template>,
}

impl TemplatePool {
  pub fn new(templates: Vec<Template>) -> Result<Self> {
    if templates.is_empty() {
      return Err(Error::NoTemplates);
    }
    Ok(Self { templates })
  }

  /// Load a JSON array of templates from `path`.
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| {
      Error::TemplateFile { path: path.to_path_buf(), source }
    })?;
    Self::new(serde_json::from_str(&raw)?)
  }

  /// Pick one template uniformly at random.
  pub fn pick(&self) -> &Template {
    self
      .templates
      .choose(&mut rand::thread_rng())
      .unwrap_or(&self.templates[0])
  }

  pub fn len(&self) -> usize { self.templates.len() }

  pub fn is_empty(&self) -> bool { self.templates.is_empty() }

  /// The stock classroom inbox.
  pub fn builtin() -> Self {
    Self {
      templates: vec![
        template(
          "Jennifer Martinez",
          "Tommy absence today - orthodontist appointment",
          "Hi Ms. Johnson, Tommy will be out for his orthodontist appointment at 10:30 AM...",
          "ABSENCE_NOTIFICATION",
          json!({
            "student": "Tommy Martinez",
            "date": "today",
            "reason": "Medical - Orthodontist",
            "returnTime": "1:00 PM",
            "homeworkRequested": true
          }),
          &[
            "UPDATE_ATTENDANCE_SYSTEM",
            "NOTIFY_OFFICE_STAFF",
            "PREPARE_HOMEWORK_PACKET",
            "SCHEDULE_MAKEUP_WORK",
            "DRAFT_PARENT_RESPONSE",
          ],
          15.0,
        ),
        template(
          "Robert Chen",
          "Concern about Emma's recent math test",
          "I noticed Emma scored 72% on her recent test. Could we discuss what topics she's struggling with?",
          "GRADE_INQUIRY",
          json!({
            "student": "Emma Chen",
            "subject": "Mathematics",
            "grade": 72,
            "requestType": "MEETING",
            "availability": "After 4 PM weekdays"
          }),
          &[
            "ANALYZE_GRADE_HISTORY",
            "IDENTIFY_PROBLEM_AREAS",
            "CHECK_CALENDAR_AVAILABILITY",
            "GENERATE_PERFORMANCE_REPORT",
            "PROPOSE_MEETING_TIMES",
            "DRAFT_DETAILED_RESPONSE",
          ],
          20.0,
        ),
        template(
          "Principal Williams",
          "URGENT: State testing schedule update",
          "All teachers must update lesson plans for the new testing window March 22-24...",
          "ADMINISTRATIVE_REQUEST",
          json!({
            "urgency": "HIGH",
            "action": "UPDATE_LESSON_PLANS",
            "deadline": "End of day",
            "dates": ["2024-03-22", "2024-03-23", "2024-03-24"]
          }),
          &[
            "ACKNOWLEDGE_RECEIPT",
            "UPDATE_CALENDAR",
            "ADJUST_LESSON_PLANS",
            "NOTIFY_STUDENTS",
            "UPDATE_PARENT_NEWSLETTER",
            "SUBMIT_CONFIRMATION",
          ],
          25.0,
        ),
        template(
          "Lisa Thompson",
          "Jake's reading progress",
          "I wanted to check in about Jake's reading level. He mentioned struggling with...",
          "PROGRESS_INQUIRY",
          json!({
            "student": "Jake Thompson",
            "subject": "Reading",
            "concern": "Comprehension difficulties"
          }),
          &[
            "PULL_READING_SCORES",
            "GENERATE_PROGRESS_REPORT",
            "IDENTIFY_INTERVENTIONS",
            "DRAFT_RESPONSE",
          ],
          12.0,
        ),
        template(
          "David Wilson",
          "Field trip permission slip",
          "Attached is the signed permission slip for tomorrow's science museum trip...",
          "PERMISSION_SUBMISSION",
          json!({
            "student": "Michael Wilson",
            "event": "Science Museum Field Trip",
            "date": "Tomorrow"
          }),
          &["UPDATE_PERMISSION_TRACKER", "ADD_TO_TRIP_ROSTER", "SEND_CONFIRMATION"],
          8.0,
        ),
      ],
    }
  }
}

fn template(
  sender: &str,
  subject: &str,
  preview: &str,
  intent: &str,
  entities: Value,
  workflows: &[&str],
  value_estimate: f64,
) -> Template {
  Template {
    payload: Payload {
      sender:   sender.to_owned(),
      subject:  subject.to_owned(),
      preview:  preview.to_owned(),
      intent:   intent.to_owned(),
      entities: match entities {
        Value::Object(map) => map,
        _ => Default::default(),
      },
    },
    workflows: workflows.iter().map(|w| (*w).to_owned()).collect(),
    value_estimate,
  }
}
