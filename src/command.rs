//! Decoded edit requests.
//!
//! A [`Command`] is what the request layer hands over once it has decoded
//! a client call: the operation name plus its named parameters. Commands
//! deserialize from JSON objects tagged by `"action"`.

use serde::{Deserialize, Serialize};

use crate::editor::Editor;
use crate::error::Result;
use crate::model::{
    BoundingBox, ClefDeletion, ClefShape, EditOutcome, HeadShape, NeumeShape, Pitch,
    PitchUpdate,
};

/// One edit operation and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    InsertPunctum {
        #[serde(default)]
        before_id: Option<String>,
        #[serde(default)]
        pitch: Option<Pitch>,
        #[serde(default)]
        dot_form: Option<String>,
        bbox: BoundingBox,
    },
    MoveNeume {
        id: String,
        #[serde(default)]
        before_id: Option<String>,
        #[serde(default)]
        pitches: Option<Vec<Pitch>>,
        bbox: BoundingBox,
    },
    DeleteNeume {
        ids: Vec<String>,
    },
    UpdateNeumeHeadShape {
        id: String,
        shape: NeumeShape,
        bbox: BoundingBox,
    },
    Neumify {
        ids: Vec<String>,
        type_id: String,
        head_shapes: Vec<HeadShape>,
        bbox: BoundingBox,
    },
    Ungroup {
        ids: Vec<String>,
        boxes: Vec<Vec<BoundingBox>>,
    },
    AddDot {
        id: String,
        form: String,
        bbox: BoundingBox,
    },
    DeleteDot {
        id: String,
        bbox: BoundingBox,
    },
    InsertDivision {
        #[serde(default)]
        before_id: Option<String>,
        form: String,
        bbox: BoundingBox,
    },
    MoveDivision {
        id: String,
        #[serde(default)]
        before_id: Option<String>,
        bbox: BoundingBox,
    },
    DeleteDivision {
        ids: Vec<String>,
    },
    InsertClef {
        #[serde(default)]
        before_id: Option<String>,
        shape: ClefShape,
        line: u32,
        #[serde(default)]
        pitch_info: Vec<PitchUpdate>,
        bbox: BoundingBox,
    },
    MoveClef {
        id: String,
        line: u32,
        #[serde(default)]
        pitch_info: Vec<PitchUpdate>,
        bbox: BoundingBox,
    },
    UpdateClefShape {
        id: String,
        shape: ClefShape,
        #[serde(default)]
        pitch_info: Vec<PitchUpdate>,
        bbox: BoundingBox,
    },
    DeleteClef {
        clefs: Vec<ClefDeletion>,
    },
    UpdatePitchedElements {
        pitch_info: Vec<PitchUpdate>,
    },
    InsertCustos {
        #[serde(default)]
        before_id: Option<String>,
        #[serde(default)]
        pitch: Option<Pitch>,
        bbox: BoundingBox,
    },
    MoveCustos {
        id: String,
        #[serde(default)]
        pitch: Option<Pitch>,
        bbox: BoundingBox,
    },
    DeleteCustos {
        ids: Vec<String>,
    },
    InsertSystem {
        page_id: String,
        bbox: BoundingBox,
    },
    UpdateSystemZone {
        id: String,
        bbox: BoundingBox,
    },
    DeleteSystem {
        ids: Vec<String>,
    },
    InsertSystemBreak {
        system_id: String,
        order: u32,
        #[serde(default)]
        next_sb_id: Option<String>,
    },
    ModifySystemBreak {
        id: String,
        order: u32,
    },
    DeleteSystemBreak {
        ids: Vec<String>,
    },
}

impl Command {
    /// Decode a command from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn created(id: String) -> Result<EditOutcome> {
    Ok(EditOutcome::Created { id })
}

fn done(result: Result<()>) -> Result<EditOutcome> {
    result.map(|()| EditOutcome::Done)
}

impl Editor {
    /// Apply one decoded command.
    pub fn apply(&mut self, command: &Command) -> Result<EditOutcome> {
        log::debug!("applying {command:?}");
        match command {
            Command::InsertPunctum {
                before_id,
                pitch,
                dot_form,
                bbox,
            } => created(self.insert_punctum(
                before_id.as_deref(),
                pitch.as_ref(),
                dot_form.as_deref(),
                bbox,
            )?),
            Command::MoveNeume {
                id,
                before_id,
                pitches,
                bbox,
            } => done(self.move_neume(id, before_id.as_deref(), pitches.as_deref(), bbox)),
            Command::DeleteNeume { ids } => done(self.delete_neume(ids.as_slice())),
            Command::UpdateNeumeHeadShape { id, shape, bbox } => {
                done(self.update_neume_head_shape(id, *shape, bbox))
            }
            Command::Neumify {
                ids,
                type_id,
                head_shapes,
                bbox,
            } => created(self.neumify(ids.as_slice(), type_id, head_shapes, bbox)?),
            Command::Ungroup { ids, boxes } => Ok(EditOutcome::Ungrouped {
                nids: self.ungroup(ids.as_slice(), boxes)?,
            }),
            Command::AddDot { id, form, bbox } => done(self.add_dot(id, form, bbox)),
            Command::DeleteDot { id, bbox } => done(self.delete_dot(id, bbox)),
            Command::InsertDivision {
                before_id,
                form,
                bbox,
            } => created(self.insert_division(before_id.as_deref(), form, bbox)?),
            Command::MoveDivision {
                id,
                before_id,
                bbox,
            } => done(self.move_division(id, before_id.as_deref(), bbox)),
            Command::DeleteDivision { ids } => done(self.delete_division(ids.as_slice())),
            Command::InsertClef {
                before_id,
                shape,
                line,
                pitch_info,
                bbox,
            } => created(self.insert_clef(
                before_id.as_deref(),
                *shape,
                *line,
                pitch_info,
                bbox,
            )?),
            Command::MoveClef {
                id,
                line,
                pitch_info,
                bbox,
            } => done(self.move_clef(id, *line, pitch_info, bbox)),
            Command::UpdateClefShape {
                id,
                shape,
                pitch_info,
                bbox,
            } => done(self.update_clef_shape(id, *shape, pitch_info, bbox)),
            Command::DeleteClef { clefs } => done(self.delete_clef(clefs)),
            Command::UpdatePitchedElements { pitch_info } => {
                done(self.update_pitched_elements(pitch_info))
            }
            Command::InsertCustos {
                before_id,
                pitch,
                bbox,
            } => created(self.insert_custos(before_id.as_deref(), pitch.as_ref(), bbox)?),
            Command::MoveCustos { id, pitch, bbox } => {
                done(self.move_custos(id, pitch.as_ref(), bbox))
            }
            Command::DeleteCustos { ids } => done(self.delete_custos(ids.as_slice())),
            Command::InsertSystem { page_id, bbox } => {
                created(self.insert_system(page_id, bbox)?)
            }
            Command::UpdateSystemZone { id, bbox } => done(self.update_system_zone(id, bbox)),
            Command::DeleteSystem { ids } => done(self.delete_system(ids.as_slice())),
            Command::InsertSystemBreak {
                system_id,
                order,
                next_sb_id,
            } => created(self.insert_system_break(system_id, *order, next_sb_id.as_deref())?),
            Command::ModifySystemBreak { id, order } => {
                done(self.modify_system_break(id, *order))
            }
            Command::DeleteSystemBreak { ids } => done(self.delete_system_break(ids.as_slice())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_commands() {
        let cmd = Command::from_json(
            r#"{"action":"insert_division","before_id":"n3","form":"final",
                "bbox":{"ulx":1,"uly":2,"lrx":3,"lry":4}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::InsertDivision {
                before_id: Some("n3".into()),
                form: "final".into(),
                bbox: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            }
        );

        let cmd = Command::from_json(
            r#"{"action":"neumify","ids":["a","b"],"type_id":"podatus.2",
                "head_shapes":["punctum","quilisma"],
                "bbox":{"ulx":0,"uly":0,"lrx":5,"lry":5}}"#,
        )
        .unwrap();
        match cmd {
            Command::Neumify { head_shapes, .. } => {
                assert_eq!(head_shapes, vec![HeadShape::Punctum, HeadShape::Quilisma])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(Command::from_json(r#"{"action":"transpose"}"#).is_err());
    }
}
