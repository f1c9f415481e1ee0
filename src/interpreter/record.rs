//! The current input record and its field vector.
//!
//! All reconciliation between `$0`, `$1..$NF` and `NF` happens here:
//! assigning `$0` re-splits per FS, assigning a field or `NF` rebuilds `$0`
//! by joining the fields with OFS.
use crate::interpreter::value::Value;
use regex::Regex;
use std::rc::Rc;

/// How the current FS splits a record.
#[derive(Debug)]
pub enum FieldSep {
    /// FS is the empty string: one field per character.
    Runes,
    /// The default FS `" "`: split on runs of blanks, no empty fields.
    Whitespace,
    /// Multi-character FS, or one marked as a regex by `split()`.
    Pattern(Rc<Regex>),
    /// Any other single character.
    Char(char),
}

/// Splits a record into fields. `newline_splits` is set in paragraph mode,
/// where a newline separates fields regardless of FS.
pub fn split_record(s: &str, sep: &FieldSep, newline_splits: bool) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    match sep {
        FieldSep::Runes => s.chars().map(|c| c.to_string()).collect(),
        FieldSep::Whitespace => s
            .split(|c| c == ' ' || c == '\t' || c == '\n')
            .filter(|f| !f.is_empty())
            .map(|f| f.to_owned())
            .collect(),
        FieldSep::Pattern(re) => re.split(s).map(|f| f.to_owned()).collect(),
        FieldSep::Char(sep) => s
            .split(|c| c == *sep || (newline_splits && c == '\n'))
            .map(|f| f.to_owned())
            .collect(),
    }
}

#[derive(Debug, Default)]
pub struct Record {
    record: String,
    fields: Vec<String>,
}

impl Record {
    pub fn new() -> Record {
        Record::default()
    }

    /// Replaces the whole record and re-splits it. Returns the new NF.
    pub fn set_record(&mut self, record: String, sep: &FieldSep, newline_splits: bool) -> usize {
        self.fields = split_record(&record, sep, newline_splits);
        self.record = record;
        self.fields.len()
    }

    pub fn record(&self) -> &str {
        &self.record
    }

    pub fn nf(&self) -> usize {
        self.fields.len()
    }

    /// `$i`. Index 0 is the whole record; past the last field is an empty
    /// input string, matching what an empty field reads as.
    pub fn get_field(&self, index: usize) -> Value {
        if index == 0 {
            return Value::StrNum(self.record.clone());
        }
        match self.fields.get(index - 1) {
            Some(field) => Value::StrNum(field.clone()),
            None => Value::StrNum(String::new()),
        }
    }

    /// Assigns `$index` (index ≥ 1), extending with empty fields as needed,
    /// and rebuilds `$0` with OFS. Returns the new NF.
    pub fn set_field(&mut self, index: usize, value: String, ofs: &str) -> usize {
        while self.fields.len() < index {
            self.fields.push(String::new());
        }
        self.fields[index - 1] = value;
        self.record = self.fields.join(ofs);
        self.fields.len()
    }

    /// Assigning NF truncates or extends the field list and rebuilds `$0`.
    pub fn set_nf(&mut self, nf: usize, ofs: &str) {
        self.fields.resize(nf, String::new());
        self.record = self.fields.join(ofs);
    }
}
