//! Record-by-record parsing of the text model format.
//!
//! Each non-empty, non-comment line is split on whitespace and dispatched on
//! its leading keyword (`v`, `vn`, `vt`, `f`, `o`, `g`, `usemtl`). Unknown
//! keywords are skipped. Face corners are resolved to zero-based indices
//! while reading (negative indices count back from the last element declared
//! so far) and validated against the final array sizes once the whole file
//! has been read.

use rustc_hash::FxHashMap;

use crate::error::ObjError;
use crate::face::{Face, FaceRef};
use crate::model::{DEFAULT_OBJECT_NAME, NamedObject, ParsedModel};

/// A face corner whose indices have not yet been range checked.
#[derive(Clone, Copy, Debug, PartialEq)]
struct RawRef {
    vertex: i64,
    texcoord: Option<i64>,
    normal: Option<i64>,
}

#[derive(Default)]
struct ModelBuilder {
    vertices: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    faces: Vec<(usize, Vec<RawRef>)>,
    object_names: Vec<String>,
    object_ids: FxHashMap<String, usize>,
    current: String,
    materials: Vec<String>,
}

pub(crate) fn parse(text: &str) -> Result<ParsedModel, ObjError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut builder = ModelBuilder {
        current: DEFAULT_OBJECT_NAME.to_string(),
        ..ModelBuilder::default()
    };
    let mut args: Vec<&str> = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        args.clear();
        args.extend(tokens);

        match keyword {
            "v" if args.len() >= 3 => {
                let v = parse_floats::<3>(&args, line_no)?;
                builder.vertices.push(v);
            }
            "vn" if args.len() >= 3 => {
                let n = parse_floats::<3>(&args, line_no)?;
                builder.normals.push(n);
            }
            "vt" if args.len() >= 2 => {
                let t = parse_floats::<2>(&args, line_no)?;
                builder.texcoords.push(t);
            }
            "f" => builder.push_face(&args, line_no)?,
            "o" | "g" => builder.begin_object(args.first().copied()),
            "usemtl" => {
                if let Some(name) = args.first() {
                    builder.materials.push((*name).to_string());
                }
            }
            _ => {}
        }
    }

    Ok(builder.finish())
}

impl ModelBuilder {
    fn begin_object(&mut self, name: Option<&str>) {
        self.current = match name {
            Some(name) => name.to_string(),
            None => format!("object_{}", self.object_names.len()),
        };
    }

    fn push_face(&mut self, args: &[&str], line: usize) -> Result<(), ObjError> {
        let corners = args
            .iter()
            .map(|token| self.parse_corner(token, line))
            .collect::<Result<Vec<_>, _>>()?;

        let object = match self.object_ids.get(&self.current) {
            Some(&id) => id,
            None => {
                let id = self.object_names.len();
                self.object_names.push(self.current.clone());
                self.object_ids.insert(self.current.clone(), id);
                id
            }
        };
        self.faces.push((object, corners));
        Ok(())
    }

    fn parse_corner(&self, token: &str, line: usize) -> Result<RawRef, ObjError> {
        let malformed = || ObjError::MalformedFaceRef {
            line,
            token: token.to_string(),
        };

        let mut parts = token.split('/');
        let vertex = parts.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;
        let texcoord = parts.next().filter(|s| !s.is_empty());
        let normal = parts.next().filter(|s| !s.is_empty());
        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(RawRef {
            vertex: resolve_index(parse_index(vertex, line)?, self.vertices.len()),
            texcoord: texcoord
                .map(|t| parse_index(t, line).map(|i| resolve_index(i, self.texcoords.len())))
                .transpose()?,
            normal: normal
                .map(|n| parse_index(n, line).map(|i| resolve_index(i, self.normals.len())))
                .transpose()?,
        })
    }

    /// Range checks every corner, drops faces left with fewer than three
    /// corners and objects left without faces.
    fn finish(self) -> ParsedModel {
        let vertex_count = self.vertices.len();
        let texcoord_count = self.texcoords.len();
        let normal_count = self.normals.len();

        let mut objects: Vec<NamedObject> = self
            .object_names
            .into_iter()
            .map(|name| NamedObject {
                name,
                face_ids: Vec::new(),
            })
            .collect();
        let mut faces: Vec<Face> = Vec::with_capacity(self.faces.len());
        let mut dropped_corners = 0usize;
        let mut dropped_faces = 0usize;

        for (object, raw) in self.faces {
            let face: Face = raw
                .iter()
                .filter_map(|r| {
                    let vertex = checked_index(r.vertex, vertex_count)?;
                    Some(FaceRef {
                        vertex,
                        texcoord: r.texcoord.and_then(|t| checked_index(t, texcoord_count)),
                        normal: r.normal.and_then(|n| checked_index(n, normal_count)),
                    })
                })
                .collect();
            dropped_corners += raw.len() - face.len();

            if face.len() < 3 {
                dropped_faces += 1;
                continue;
            }
            objects[object].face_ids.push(faces.len());
            faces.push(face);
        }

        if dropped_corners > 0 || dropped_faces > 0 {
            tracing::debug!(dropped_corners, dropped_faces, "discarded invalid face data");
        }

        objects.retain(|o| !o.face_ids.is_empty());
        let object_lookup = objects
            .iter()
            .enumerate()
            .map(|(i, o)| (o.name.clone(), i))
            .collect();

        ParsedModel {
            vertices: self.vertices,
            normals: self.normals,
            texcoords: self.texcoords,
            faces,
            objects,
            object_lookup,
            materials: self.materials,
        }
    }
}

fn parse_floats<const N: usize>(args: &[&str], line: usize) -> Result<[f32; N], ObjError> {
    let mut out = [0.0; N];
    for (slot, token) in out.iter_mut().zip(args) {
        *slot = token.parse().map_err(|_| ObjError::MalformedNumber {
            line,
            token: (*token).to_string(),
        })?;
    }
    Ok(out)
}

fn parse_index(token: &str, line: usize) -> Result<i64, ObjError> {
    token.parse().map_err(|_| ObjError::MalformedNumber {
        line,
        token: token.to_string(),
    })
}

/// Converts a 1-based (or negative, relative) index to zero-based.
/// Index 0 has no meaning and maps to -1, which never passes validation.
fn resolve_index(index: i64, declared: usize) -> i64 {
    match index {
        i if i > 0 => i - 1,
        i if i < 0 => declared as i64 + i,
        _ => -1,
    }
}

fn checked_index(index: i64, len: usize) -> Option<u32> {
    u32::try_from(index).ok().filter(|&i| (i as usize) < len)
}
