//! The reference set: the per-run snapshot of valid company codes.
//!
//! Built once at the start of a run and never mutated afterwards. Every
//! dependent table is reconciled against it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
  frame::{Cell, Frame},
  ident::CvmCode,
  schema::ColumnSpec,
};

/// One row of the `companies` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
  pub cvm_code:     CvmCode,
  pub name:         Option<String>,
  pub sector:       Option<String>,
  pub sub_sector:   Option<String>,
  pub segment:      Option<String>,
  pub is_foreign:   Option<bool>,
  pub is_b3_listed: Option<bool>,
}

impl Company {
  pub fn new(cvm_code: CvmCode) -> Self {
    Self {
      cvm_code,
      name: None,
      sector: None,
      sub_sector: None,
      segment: None,
      is_foreign: None,
      is_b3_listed: None,
    }
  }

  /// Domestic and listed on B3. Unknown flags do not qualify.
  pub fn is_domestic_listed(&self) -> bool {
    self.is_foreign == Some(false) && self.is_b3_listed == Some(true)
  }

  fn into_row(self) -> Vec<Cell> {
    vec![
      Cell::Text(self.cvm_code.into()),
      self.name.into(),
      self.sector.into(),
      self.sub_sector.into(),
      self.segment.into(),
      self.is_foreign.into(),
      self.is_b3_listed.into(),
    ]
  }
}

/// Deduplicated company codes in first-seen order, with their attribute rows.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
  codes:     Vec<CvmCode>,
  index:     HashSet<CvmCode>,
  companies: Vec<Company>,
}

impl ReferenceSet {
  /// Build from company rows. When a code repeats, the first row wins.
  pub fn from_companies(companies: impl IntoIterator<Item = Company>) -> Self {
    let mut set = Self::default();
    for company in companies {
      if set.index.insert(company.cvm_code.clone()) {
        set.codes.push(company.cvm_code.clone());
        set.companies.push(company);
      }
    }
    set
  }

  pub fn codes(&self) -> &[CvmCode] { &self.codes }

  pub fn companies(&self) -> &[Company] { &self.companies }

  pub fn contains(&self, code: &str) -> bool {
    CvmCode::new(code).is_ok_and(|c| self.index.contains(&c))
  }

  pub fn len(&self) -> usize { self.codes.len() }

  pub fn is_empty(&self) -> bool { self.codes.is_empty() }

  /// The company rows laid out as [`ColumnSpec::companies`].
  pub fn companies_frame(&self) -> Frame {
    let mut frame = Frame::new(ColumnSpec::companies().names())
      .unwrap_or_default();
    for company in self.companies.iter().cloned() {
      // Width always matches the fixed layout.
      let _ = frame.push_row(company.into_row());
    }
    frame
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn company(code: &str, name: &str) -> Company {
    Company {
      name: Some(name.into()),
      ..Company::new(CvmCode::new(code).unwrap())
    }
  }

  #[test]
  fn dedups_preserving_first_seen_order() {
    let set = ReferenceSet::from_companies([
      company("300", "C"),
      company("100", "A"),
      company("300", "C again"),
      company("200", "B"),
    ]);
    let codes: Vec<&str> = set.codes().iter().map(CvmCode::as_str).collect();
    assert_eq!(codes, ["300", "100", "200"]);
    assert_eq!(set.companies()[0].name.as_deref(), Some("C"));
  }

  #[test]
  fn contains_normalises_input() {
    let set = ReferenceSet::from_companies([company("100", "A")]);
    assert!(set.contains("100"));
    assert!(set.contains(" 100"));
    assert!(!set.contains("200"));
    assert!(!set.contains(""));
  }

  #[test]
  fn domestic_listed_requires_known_flags() {
    let mut c = company("1", "x");
    assert!(!c.is_domestic_listed());
    c.is_foreign = Some(false);
    c.is_b3_listed = Some(true);
    assert!(c.is_domestic_listed());
    c.is_foreign = Some(true);
    assert!(!c.is_domestic_listed());
  }

  #[test]
  fn companies_frame_matches_layout() {
    let mut c = company("100", "A");
    c.is_foreign = Some(false);
    let frame = ReferenceSet::from_companies([c]).companies_frame();
    assert_eq!(frame.len(), 1);
    assert_eq!(frame.get(0, "cvm_code"), Some(&Cell::text("100")));
    assert_eq!(frame.get(0, "is_foreign"), Some(&Cell::Bool(false)));
    assert_eq!(frame.get(0, "is_b3_listed"), Some(&Cell::Null));
  }
}
