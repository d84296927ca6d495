// src/form_fill.rs

use crate::document::FieldSet;
use crate::error::{BolError, FieldWarning};
use crate::fields::{self, FieldValue};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Writes a field set into a fillable PDF.
pub trait FormFiller {
    /// Fill `fields` and write the result to `out_path`. Per-field problems
    /// come back as warnings; only template or I/O failures are errors.
    fn fill(&self, fields: &FieldSet, out_path: &Path) -> Result<Vec<FieldWarning>, BolError>;
}

/// An AcroForm template on disk.
pub struct PdfTemplate {
    path: PathBuf,
}

impl PdfTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FormFiller for PdfTemplate {
    fn fill(&self, fields: &FieldSet, out_path: &Path) -> Result<Vec<FieldWarning>, BolError> {
        if !self.path.is_file() {
            return Err(BolError::TemplateMissing(self.path.clone()));
        }
        let mut doc = Document::load(&self.path)?;
        let warnings = fill_document(&mut doc, fields);

        if let Some(dir) = out_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        doc.compress();
        doc.save(out_path)?;
        info!(path = %out_path.display(), warnings = warnings.len(), "BOL written");
        Ok(warnings)
    }
}

/// One terminal form field and the widget annotations that draw it.
#[derive(Debug)]
struct FormField {
    id: ObjectId,
    name: String,
    checkbox: bool,
    widgets: Vec<ObjectId>,
}

/// Button field flags (PDF 32000-1, table 226).
const FF_RADIO: i64 = 1 << 15;
const FF_PUSHBUTTON: i64 = 1 << 16;
const MAX_DEPTH: usize = 32;

/// Apply every field in `values` that the template defines. Template fields
/// missing from `values` are left as they are.
pub fn fill_document(doc: &mut Document, values: &FieldSet) -> Vec<FieldWarning> {
    let mut warnings = Vec::new();
    let form_fields = collect_fields(doc);
    if form_fields.is_empty() {
        warn!("Template has no AcroForm fields");
    }

    for ff in &form_fields {
        let Some(raw) = values.get(&ff.name) else {
            continue;
        };
        let value = fields::classify(&ff.name, Some(raw), ff.checkbox);
        if let Err(e) = set_field(doc, ff, &value) {
            warn!(field = %ff.name, error = %e, "Failed to fill field");
            warnings.push(FieldWarning {
                field: ff.name.clone(),
                message: e.to_string(),
            });
        }
    }

    if let Err(e) = set_need_appearances(doc) {
        warn!(error = %e, "Could not set NeedAppearances");
    }
    warnings
}

fn acroform(doc: &Document) -> Option<&Dictionary> {
    let root = doc.trailer.get(b"Root").ok()?;
    let (_, catalog) = doc.dereference(root).ok()?;
    let form = catalog.as_dict().ok()?.get(b"AcroForm").ok()?;
    doc.dereference(form).ok()?.1.as_dict().ok()
}

fn collect_fields(doc: &Document) -> Vec<FormField> {
    let mut out = Vec::new();
    let Some(roots) = acroform(doc)
        .and_then(|form| form.get(b"Fields").ok())
        .and_then(|f| doc.dereference(f).ok())
        .and_then(|(_, resolved)| resolved.as_array().ok())
    else {
        return out;
    };

    for root in roots {
        if let Ok(id) = root.as_reference() {
            walk(doc, id, None, None, 0, 0, &mut out);
        }
    }
    out
}

/// Depth-first over the field tree; `/FT` and `/Ff` inherit down the tree.
fn walk(
    doc: &Document,
    id: ObjectId,
    parent: Option<&str>,
    inherited_ft: Option<&[u8]>,
    inherited_ff: i64,
    depth: usize,
    out: &mut Vec<FormField>,
) {
    if depth > MAX_DEPTH {
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        return;
    };

    let name = match (parent, dict.get(b"T").ok().and_then(decode_text)) {
        (Some(p), Some(t)) => format!("{p}.{t}"),
        (None, Some(t)) => t,
        (Some(p), None) => p.to_string(),
        (None, None) => return,
    };
    let ft = dict.get(b"FT").ok().and_then(|o| o.as_name().ok()).or(inherited_ft);
    let ff = dict.get(b"Ff").ok().and_then(|o| o.as_i64().ok()).unwrap_or(inherited_ff);

    let kids: Vec<ObjectId> = dict
        .get(b"Kids")
        .ok()
        .and_then(|k| doc.dereference(k).ok())
        .and_then(|(_, resolved)| resolved.as_array().ok())
        .map(|arr| arr.iter().filter_map(|o| o.as_reference().ok()).collect())
        .unwrap_or_default();

    let (fields, widgets): (Vec<ObjectId>, Vec<ObjectId>) = kids.into_iter().partition(|kid| {
        doc.get_dictionary(*kid).is_ok_and(|d| d.has(b"T"))
    });

    for kid in fields {
        walk(doc, kid, Some(name.as_str()), ft, ff, depth + 1, out);
    }

    // A field with only child fields is not itself fillable.
    if !widgets.is_empty() || !dict.has(b"Kids") {
        out.push(FormField {
            id,
            name,
            checkbox: ft == Some(b"Btn".as_slice()) && ff & (FF_RADIO | FF_PUSHBUTTON) == 0,
            widgets: if widgets.is_empty() { vec![id] } else { widgets },
        });
    }
}

fn set_field(doc: &mut Document, field: &FormField, value: &FieldValue) -> lopdf::Result<()> {
    match value {
        FieldValue::Checkbox(checked) => {
            let off = FieldValue::Checkbox(false).as_export().as_bytes().to_vec();
            let mut field_state = off.clone();
            for &widget in &field.widgets {
                let state = if *checked { on_state(doc, widget) } else { off.clone() };
                if *checked && field_state == off {
                    field_state = state.clone();
                }
                doc.get_object_mut(widget)?
                    .as_dict_mut()?
                    .set("AS", Object::Name(state));
            }
            doc.get_object_mut(field.id)?
                .as_dict_mut()?
                .set("V", Object::Name(field_state));
        }
        FieldValue::Text(text) => {
            doc.get_object_mut(field.id)?
                .as_dict_mut()?
                .set("V", encode_text(text));
        }
    }
    Ok(())
}

/// Name of the widget's "on" appearance, `Yes` when the template has none.
fn on_state(doc: &Document, widget: ObjectId) -> Vec<u8> {
    doc.get_dictionary(widget)
        .ok()
        .and_then(|d| d.get(b"AP").ok())
        .and_then(|ap| doc.dereference(ap).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|n| doc.dereference(n).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .and_then(|n| n.iter().map(|(k, _)| k).find(|k| k.as_slice() != b"Off").cloned())
        .unwrap_or_else(|| FieldValue::Checkbox(true).as_export().as_bytes().to_vec())
}

fn set_need_appearances(doc: &mut Document) -> lopdf::Result<()> {
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    let form = doc.get_dictionary(root_id)?.get(b"AcroForm")?.clone();
    match form {
        Object::Reference(id) => {
            doc.get_object_mut(id)?
                .as_dict_mut()?
                .set("NeedAppearances", true);
        }
        Object::Dictionary(_) => {
            doc.get_object_mut(root_id)?
                .as_dict_mut()?
                .get_mut(b"AcroForm")?
                .as_dict_mut()?
                .set("NeedAppearances", true);
        }
        _ => {}
    }
    Ok(())
}

/// PDF text string: plain bytes for ASCII, UTF-16BE with BOM otherwise.
fn encode_text(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(|u| u.to_be_bytes()));
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn decode_text(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    if let Some(utf16) = bytes.strip_prefix(&[0xFE_u8, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }
    Some(String::from_utf8_lossy(bytes).into_owned())
}
