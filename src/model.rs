//! Data model for the chant-notation editing engine.
//!
//! These types describe what the editor works with: the closed set of
//! element kinds it knows how to restructure, the bounding boxes that link
//! elements to the facsimile image, and the payloads carried by edit
//! requests (pitches, head shapes, neume types).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EditError;

// ─── Element kinds ───────────────────────────────────────────────────

/// Structural role of an element, resolved from its tag name (and, for
/// divisions, its `form`) when the node is created or reclassified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Page,
    System,
    /// System break: carries an order number `n` and a `systemref`.
    SystemBreak,
    Section,
    Staff,
    Layer,
    StaffGroup,
    StaffDef,
    /// Facsimile surface holding every zone.
    Surface,
    Zone,
    Neume,
    /// Note component group (`nc`) inside a neume.
    NoteComponent,
    Note,
    Dot,
    /// Phrase marker.
    Division(DivisionForm),
    Clef,
    Custos,
    Other,
}

impl ElementKind {
    /// Classify an element from its tag and its `form` attribute.
    pub fn classify(tag: &str, form: Option<&str>) -> Self {
        match tag {
            "page" => ElementKind::Page,
            "system" => ElementKind::System,
            "sb" => ElementKind::SystemBreak,
            "section" => ElementKind::Section,
            "staff" => ElementKind::Staff,
            "layer" => ElementKind::Layer,
            "staffGrp" => ElementKind::StaffGroup,
            "staffDef" => ElementKind::StaffDef,
            "surface" => ElementKind::Surface,
            "zone" => ElementKind::Zone,
            "neume" => ElementKind::Neume,
            "nc" => ElementKind::NoteComponent,
            "note" => ElementKind::Note,
            "dot" => ElementKind::Dot,
            "division" => ElementKind::Division(DivisionForm::from_attr(form)),
            "clef" => ElementKind::Clef,
            "custos" => ElementKind::Custos,
            _ => ElementKind::Other,
        }
    }

    /// Whether this is a phrase-end division, the one that closes a staff.
    pub fn is_final_division(&self) -> bool {
        matches!(self, ElementKind::Division(DivisionForm::Final))
    }
}

/// Form classifier of a division (phrase marker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivisionForm {
    Comma,
    Small,
    Minor,
    Major,
    /// Phrase end: always the last element of its layer.
    Final,
    /// Any form value the editor does not recognize.
    Other,
}

impl DivisionForm {
    fn from_attr(form: Option<&str>) -> Self {
        match form.map(str::trim) {
            Some("comma") => DivisionForm::Comma,
            Some("small") => DivisionForm::Small,
            Some("minor") => DivisionForm::Minor,
            Some("major") => DivisionForm::Major,
            Some("final") => DivisionForm::Final,
            _ => DivisionForm::Other,
        }
    }
}

// ─── Bounding boxes ──────────────────────────────────────────────────

/// A rectangle on the facsimile image, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Upper-left x
    pub ulx: f64,
    /// Upper-left y
    pub uly: f64,
    /// Lower-right x
    pub lrx: f64,
    /// Lower-right y
    pub lry: f64,
}

impl BoundingBox {
    pub fn new(ulx: f64, uly: f64, lrx: f64, lry: f64) -> Self {
        Self { ulx, uly, lrx, lry }
    }

    /// The four edges as `(attribute, value)` pairs in zone attribute order.
    pub fn edges(&self) -> [(&'static str, f64); 4] {
        [
            ("ulx", self.ulx),
            ("uly", self.uly),
            ("lrx", self.lrx),
            ("lry", self.lry),
        ]
    }
}

// ─── Pitches ─────────────────────────────────────────────────────────

/// Pitch of a note or custos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    /// Pitch name: a–g
    pub pname: String,
    /// Octave number
    pub oct: i32,
}

impl Pitch {
    pub fn new(pname: impl Into<String>, oct: i32) -> Self {
        Self {
            pname: pname.into(),
            oct,
        }
    }
}

/// New pitch information for one element. A custos takes a single pitch;
/// a neume takes one pitch per note, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteInfo {
    Single(Pitch),
    Many(Vec<Pitch>),
}

impl NoteInfo {
    pub fn pitches(&self) -> &[Pitch] {
        match self {
            NoteInfo::Single(p) => std::slice::from_ref(p),
            NoteInfo::Many(ps) => ps,
        }
    }
}

/// One row of a pitch table computed by the client after a clef change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchUpdate {
    pub id: String,
    #[serde(rename = "noteInfo")]
    pub note_info: NoteInfo,
}

/// A clef to delete plus the pitch table to apply once it is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClefDeletion {
    pub id: String,
    #[serde(rename = "pitchInfo", default)]
    pub pitch_info: Option<Vec<PitchUpdate>>,
}

// ─── Shapes ──────────────────────────────────────────────────────────

/// Head-shape classifier of a note component group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadShape {
    Punctum,
    PunctumInclinatum,
    PunctumInclinatumParvum,
    Quilisma,
}

impl HeadShape {
    /// Attributes carried by an `nc` of this classifier.
    pub fn nc_attributes(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            HeadShape::Punctum => &[],
            HeadShape::PunctumInclinatum => &[("inclinatum", "true")],
            HeadShape::PunctumInclinatumParvum => {
                &[("inclinatum", "true"), ("deminutus", "true")]
            }
            HeadShape::Quilisma => &[("quilisma", "true")],
        }
    }
}

impl FromStr for HeadShape {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "punctum" => Ok(HeadShape::Punctum),
            "punctum_inclinatum" => Ok(HeadShape::PunctumInclinatum),
            "punctum_inclinatum_parvum" => Ok(HeadShape::PunctumInclinatumParvum),
            "quilisma" => Ok(HeadShape::Quilisma),
            other => Err(EditError::InvalidState(format!(
                "unknown head shape '{other}'"
            ))),
        }
    }
}

/// Shape a single-note neume can be switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeumeShape {
    Punctum,
    PunctumInclinatum,
    PunctumInclinatumParvum,
    Quilisma,
    Virga,
    Cavum,
    Tractulus,
    Gravis,
    Oriscus,
    Stropha,
}

impl NeumeShape {
    /// Neume `name` attribute for this shape.
    pub fn neume_name(&self) -> &'static str {
        match self {
            NeumeShape::Punctum
            | NeumeShape::PunctumInclinatum
            | NeumeShape::PunctumInclinatumParvum
            | NeumeShape::Quilisma => "punctum",
            NeumeShape::Virga => "virga",
            NeumeShape::Cavum => "cavum",
            NeumeShape::Tractulus => "tractulus",
            NeumeShape::Gravis => "gravis",
            NeumeShape::Oriscus => "oriscus",
            NeumeShape::Stropha => "stropha",
        }
    }

    /// The note-component classifier implied by this shape. Shapes that
    /// are neume names of their own carry a plain component.
    pub fn head(&self) -> HeadShape {
        match self {
            NeumeShape::PunctumInclinatum => HeadShape::PunctumInclinatum,
            NeumeShape::PunctumInclinatumParvum => HeadShape::PunctumInclinatumParvum,
            NeumeShape::Quilisma => HeadShape::Quilisma,
            _ => HeadShape::Punctum,
        }
    }
}

impl FromStr for NeumeShape {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let shape = match s {
            "virga" => NeumeShape::Virga,
            "cavum" => NeumeShape::Cavum,
            "tractulus" => NeumeShape::Tractulus,
            "gravis" => NeumeShape::Gravis,
            "oriscus" => NeumeShape::Oriscus,
            "stropha" => NeumeShape::Stropha,
            other => match other.parse::<HeadShape>()? {
                HeadShape::Punctum => NeumeShape::Punctum,
                HeadShape::PunctumInclinatum => NeumeShape::PunctumInclinatum,
                HeadShape::PunctumInclinatumParvum => NeumeShape::PunctumInclinatumParvum,
                HeadShape::Quilisma => NeumeShape::Quilisma,
            },
        };
        Ok(shape)
    }
}

/// Clef shape: doh (C) or fah (F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClefShape {
    #[serde(alias = "c")]
    C,
    #[serde(alias = "f")]
    F,
}

impl ClefShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClefShape::C => "C",
            ClefShape::F => "F",
        }
    }
}

impl FromStr for ClefShape {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" => Ok(ClefShape::C),
            "F" => Ok(ClefShape::F),
            other => Err(EditError::InvalidState(format!(
                "unknown clef shape '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ClefShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Neume types ─────────────────────────────────────────────────────

/// Name and optional variant of a grouped neume, parsed from a client
/// type id such as `"torculus.liquescent.2"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeumeType {
    pub name: String,
    pub variant: Option<String>,
}

impl FromStr for NeumeType {
    type Err = EditError;

    /// Segments are dot-separated; a trailing all-digit segment only
    /// disambiguates client palette entries and is dropped. Remaining
    /// segments after the first form the variant, joined by spaces.
    fn from_str(type_id: &str) -> Result<Self, Self::Err> {
        let mut segments: Vec<&str> = type_id.split('.').collect();
        if segments.len() > 1
            && segments
                .last()
                .is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        {
            segments.pop();
        }

        let name = segments.first().map(|s| s.trim()).unwrap_or_default();
        if name.is_empty() {
            return Err(EditError::InvalidState(format!(
                "empty neume type in '{type_id}'"
            )));
        }

        let variant = if segments.len() > 1 {
            Some(segments[1..].join(" "))
        } else {
            None
        };

        Ok(NeumeType {
            name: name.to_string(),
            variant,
        })
    }
}

// ─── Results ─────────────────────────────────────────────────────────

/// What an applied edit hands back to the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EditOutcome {
    /// A newly created element's ID.
    Created { id: String },
    /// New neume IDs, one list per ungrouped input ID.
    Ungrouped { nids: Vec<Vec<String>> },
    /// Plain success.
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neume_type_drops_numeric_suffix() {
        let t: NeumeType = "torculus.liquescent.2".parse().unwrap();
        assert_eq!(t.name, "torculus");
        assert_eq!(t.variant.as_deref(), Some("liquescent"));

        let t: NeumeType = "podatus.3".parse().unwrap();
        assert_eq!(t.name, "podatus");
        assert_eq!(t.variant, None);

        let t: NeumeType = "scandicus.flexus.liquescent".parse().unwrap();
        assert_eq!(t.variant.as_deref(), Some("flexus liquescent"));
    }

    #[test]
    fn neume_type_rejects_empty_name() {
        assert!("".parse::<NeumeType>().is_err());
        assert!(".2".parse::<NeumeType>().is_err());
    }

    #[test]
    fn division_classification() {
        assert!(ElementKind::classify("division", Some("final")).is_final_division());
        assert!(!ElementKind::classify("division", Some("major")).is_final_division());
        assert_eq!(
            ElementKind::classify("division", None),
            ElementKind::Division(DivisionForm::Other)
        );
        assert_eq!(ElementKind::classify("nc", None), ElementKind::NoteComponent);
    }

    #[test]
    fn neume_shapes_map_to_names_and_heads() {
        let s: NeumeShape = "punctum_inclinatum_parvum".parse().unwrap();
        assert_eq!(s.neume_name(), "punctum");
        assert_eq!(
            s.head().nc_attributes(),
            &[("inclinatum", "true"), ("deminutus", "true")]
        );

        let s: NeumeShape = "virga".parse().unwrap();
        assert_eq!(s.neume_name(), "virga");
        assert!(s.head().nc_attributes().is_empty());

        assert!("podatus".parse::<NeumeShape>().is_err());
    }

    #[test]
    fn note_info_accepts_single_and_list() {
        let one: PitchUpdate =
            serde_json::from_str(r#"{"id":"c1","noteInfo":{"pname":"d","oct":3}}"#).unwrap();
        assert_eq!(one.note_info.pitches(), &[Pitch::new("d", 3)]);

        let many: PitchUpdate = serde_json::from_str(
            r#"{"id":"n1","noteInfo":[{"pname":"a","oct":2},{"pname":"b","oct":2}]}"#,
        )
        .unwrap();
        assert_eq!(many.note_info.pitches().len(), 2);
    }

    #[test]
    fn outcome_json_shapes() {
        let created = EditOutcome::Created { id: "m-1".into() };
        assert_eq!(serde_json::to_string(&created).unwrap(), r#"{"id":"m-1"}"#);
        assert_eq!(serde_json::to_string(&EditOutcome::Done).unwrap(), "null");
    }
}
