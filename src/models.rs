use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::BoardError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn id(&self) -> Option<String> {
        self.text(&["id", "_id", "uuid"])
    }

    fn first_present(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .find(|v| !v.is_null())
    }

    pub fn text(&self, keys: &[&str]) -> Option<String> {
        self.first_present(keys).and_then(value_to_text)
    }

    pub fn texts(&self, keys: &[&str]) -> Vec<String> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .filter_map(value_to_text)
            .collect()
    }

    /// First present field as a list of strings.
    ///
    /// A string that looks like a JSON array must parse as one, otherwise the
    /// field is treated as absent. Any other string is a one-element list.
    pub fn list(&self, keys: &[&str]) -> Option<Vec<String>> {
        match self.first_present(keys)? {
            Value::Array(items) => Some(items.iter().filter_map(value_to_text).collect()),
            Value::String(s) if s.trim_start().starts_with('[') => {
                serde_json::from_str::<Vec<String>>(s).ok()
            }
            Value::String(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }

    pub fn number(&self, keys: &[&str]) -> Option<f64> {
        match self.first_present(keys)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_text).collect();
            Some(parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Record(map),
            _ => Record::default(),
        }
    }
}

/// Which JSON keys feed each filter dimension of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    pub display: &'static [&'static str],
    pub keyword: &'static [&'static str],
    pub location: &'static [&'static str],
    pub job_types: &'static [&'static str],
    pub shifts: &'static [&'static str],
    pub role: &'static [&'static str],
    pub residency: &'static [&'static str],
    pub experience: &'static [&'static str],
    pub pay: &'static [&'static str],
}

impl FieldMap {
    pub fn title(&self, record: &Record) -> String {
        record
            .text(self.display)
            .unwrap_or_else(|| "(untitled)".to_string())
    }
}

pub const CANDIDATE_FIELDS: FieldMap = FieldMap {
    display: &["name", "fullName", "qualification"],
    keyword: &["name", "fullName", "qualification", "jobType", "jobTypes"],
    location: &["location", "preferredLocation"],
    job_types: &["jobTypes", "jobType", "type"],
    shifts: &["shiftPreferences", "shifts"],
    role: &["roleCategory", "qualification"],
    residency: &["residencyStatus", "visaStatus"],
    experience: &["experience", "experienceMin"],
    pay: &["maxPay", "minPay"],
};

pub const JOB_FIELDS: FieldMap = FieldMap {
    display: &["title", "qualification"],
    keyword: &["title", "qualification", "type", "jobTypes"],
    location: &["location"],
    job_types: &["jobTypes", "type"],
    shifts: &["shiftPreferences", "shifts", "shift"],
    role: &["roleCategory", "qualification"],
    residency: &["visaStatus", "residencyStatus"],
    experience: &["experienceMin", "experience"],
    pay: &["maxPay", "minPay"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    /// Employer search over all candidates
    Candidates,
    /// Employer's saved candidates
    Wishlist,
    /// Nurse search over open jobs
    Jobs,
    /// Nurse's saved jobs
    SavedJobs,
}

impl View {
    pub const ALL: [View; 4] = [View::Candidates, View::Wishlist, View::Jobs, View::SavedJobs];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Candidates => "candidates",
            View::Wishlist => "wishlist",
            View::Jobs => "jobs",
            View::SavedJobs => "saved-jobs",
        }
    }

    pub fn fields(&self) -> &'static FieldMap {
        match self {
            View::Candidates | View::Wishlist => &CANDIDATE_FIELDS,
            View::Jobs | View::SavedJobs => &JOB_FIELDS,
        }
    }

    pub fn store_prefix(&self) -> &'static str {
        match self {
            View::Candidates => "candidateFilters",
            View::Wishlist => "wishlistFilters",
            View::Jobs => "jobFilters",
            View::SavedJobs => "savedJobFilters",
        }
    }

    pub fn endpoint(&self) -> (Method, &'static str) {
        match self {
            View::Candidates => (Method::Get, "/employer/candidates"),
            View::Wishlist => (Method::Post, "/employer/wishlist"),
            View::Jobs => (Method::Get, "/jobs"),
            View::SavedJobs => (Method::Post, "/nurse/saved-jobs"),
        }
    }

    pub fn entry_key(&self) -> Option<&'static str> {
        match self {
            View::Wishlist => Some("candidate"),
            View::SavedJobs => Some("job"),
            View::Candidates | View::Jobs => None,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| BoardError::UnknownView(s.to_string()))
    }
}
