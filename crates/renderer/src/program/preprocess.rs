//! Source rewriting that turns desktop-style GLSL into something naga accepts.
//!
//! Viewer shaders declare their inputs as loose `uniform float u_time;`
//! globals and leave attribute locations implicit. Before parsing, every
//! stage gets:
//! - its `#version` line blanked,
//! - loose non-opaque uniforms blanked and collected (arrays keep their size
//!   on the type, `float[4] u_weights`),
//! - `layout(location = N)` added to bare `in`/`out` globals,
//! - a shared header with `#version 450` and one std140 block holding every
//!   collected uniform.
//!
//! Replaced lines are kept as blank lines so everything after the header
//! keeps its original relative line numbers. Declarations inside `/* */`
//! comments are never rewritten.

use std::collections::BTreeSet;

use super::{ProgramError, Stage};

/// Name of the generated uniform block.
pub(crate) const UNIFORM_BLOCK_NAME: &str = "ViewerUniforms";

const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];
const INTERPOLATION_QUALIFIERS: [&str; 5] = ["flat", "smooth", "noperspective", "centroid", "invariant"];
const OPAQUE_TYPE_PREFIXES: [&str; 6] = ["sampler", "isampler", "usampler", "image", "texture", "atomic_uint"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformDecl {
    pub ty: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    In,
    Out,
}

/// A stage-level `in` or `out` global with the location it ended up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InterfaceVar {
    pub direction: Direction,
    pub name: String,
    pub location: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct PreparedStage {
    pub source: String,
    pub interface: Vec<InterfaceVar>,
    /// Lines in front of the user's first line.
    pub header_lines: usize,
}

impl PreparedStage {
    pub fn input_location(&self, name: &str) -> Option<u32> {
        self.interface
            .iter()
            .find(|var| var.direction == Direction::In && var.name == name)
            .map(|var| var.location)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PreparedProgram {
    pub vertex: PreparedStage,
    pub fragment: PreparedStage,
    pub uniforms: Vec<UniformDecl>,
}

/// Rewrites both stages of a program around a shared uniform block.
pub(crate) fn prepare(vertex: &str, fragment: &str) -> Result<PreparedProgram, ProgramError> {
    let vertex = scan_stage(Stage::Vertex, vertex)?;
    let fragment = scan_stage(Stage::Fragment, fragment)?;

    let mut uniforms: Vec<UniformDecl> = Vec::new();
    for decl in vertex.uniforms.iter().chain(fragment.uniforms.iter()) {
        if !uniforms.iter().any(|known| known.name == decl.name) {
            uniforms.push(decl.clone());
        }
    }

    let header = header(&uniforms);
    Ok(PreparedProgram {
        vertex: vertex.assemble(&header),
        fragment: fragment.assemble(&header),
        uniforms,
    })
}

fn header(uniforms: &[UniformDecl]) -> String {
    let mut header = String::from("#version 450\n");
    if !uniforms.is_empty() {
        header.push_str(&format!(
            "layout(std140, set = 0, binding = 0) uniform {UNIFORM_BLOCK_NAME} {{\n"
        ));
        for decl in uniforms {
            header.push_str(&format!("    {} {};\n", decl.ty, decl.name));
        }
        header.push_str("};\n");
    }
    header
}

struct ScannedStage {
    lines: Vec<String>,
    uniforms: Vec<UniformDecl>,
    interface: Vec<InterfaceVar>,
}

impl ScannedStage {
    fn assemble(self, header: &str) -> PreparedStage {
        let mut source = String::with_capacity(header.len() + self.lines.len() * 32);
        source.push_str(header);
        for line in &self.lines {
            source.push_str(line);
            source.push('\n');
        }
        PreparedStage {
            source,
            interface: self.interface,
            header_lines: header.lines().count(),
        }
    }
}

struct InterfaceDecl<'a> {
    direction: Direction,
    location: Option<u32>,
    name: &'a str,
}

fn scan_stage(stage: Stage, source: &str) -> Result<ScannedStage, ProgramError> {
    let code_lines = strip_comments(source);
    let declarations: Vec<Option<InterfaceDecl<'_>>> = code_lines
        .iter()
        .map(|code| parse_interface(code.trim()))
        .collect();

    let mut taken_in = BTreeSet::new();
    let mut taken_out = BTreeSet::new();
    for decl in declarations.iter().flatten() {
        if let Some(location) = decl.location {
            match decl.direction {
                Direction::In => taken_in.insert(location),
                Direction::Out => taken_out.insert(location),
            };
        }
    }

    let mut lines = Vec::new();
    let mut uniforms = Vec::new();
    let mut interface = Vec::new();

    for (index, ((line, code), decl)) in source
        .lines()
        .zip(&code_lines)
        .zip(declarations)
        .enumerate()
    {
        let code = code.trim();

        if code.starts_with("#version") {
            lines.push(String::new());
            continue;
        }

        if let Some(decls) = parse_uniform(code) {
            uniforms.extend(decls);
            lines.push(String::new());
            continue;
        }
        if has_initialiser(code) {
            return Err(ProgramError::UnsupportedUniform {
                stage,
                line: index + 1,
                declaration: code.to_string(),
            });
        }

        match decl {
            Some(InterfaceDecl {
                direction,
                location: Some(location),
                name,
            }) => {
                interface.push(InterfaceVar {
                    direction,
                    name: name.to_string(),
                    location,
                });
                lines.push(line.to_string());
            }
            Some(InterfaceDecl {
                direction,
                location: None,
                name,
            }) => {
                let taken = match direction {
                    Direction::In => &mut taken_in,
                    Direction::Out => &mut taken_out,
                };
                let location = next_free(taken);
                interface.push(InterfaceVar {
                    direction,
                    name: name.to_string(),
                    location,
                });
                let indent = &line[..line.len() - line.trim_start().len()];
                lines.push(format!(
                    "{indent}layout(location = {location}) {}",
                    line.trim_start()
                ));
            }
            None => lines.push(line.to_string()),
        }
    }

    Ok(ScannedStage {
        lines,
        uniforms,
        interface,
    })
}

fn next_free(taken: &mut BTreeSet<u32>) -> u32 {
    let mut candidate = 0;
    while taken.contains(&candidate) {
        candidate += 1;
    }
    taken.insert(candidate);
    candidate
}

/// Returns one entry per source line with `//` and `/* */` comments blanked.
fn strip_comments(source: &str) -> Vec<String> {
    let mut in_block = false;
    source
        .lines()
        .map(|line| {
            let mut code = String::with_capacity(line.len());
            let mut rest = line;
            loop {
                if in_block {
                    match rest.find("*/") {
                        Some(end) => {
                            rest = &rest[end + 2..];
                            in_block = false;
                            code.push(' ');
                        }
                        None => break,
                    }
                    continue;
                }
                match (rest.find("//"), rest.find("/*")) {
                    (Some(line_start), Some(block_start)) if line_start < block_start => {
                        code.push_str(&rest[..line_start]);
                        break;
                    }
                    (Some(line_start), None) => {
                        code.push_str(&rest[..line_start]);
                        break;
                    }
                    (_, Some(block_start)) => {
                        code.push_str(&rest[..block_start]);
                        rest = &rest[block_start + 2..];
                        in_block = true;
                    }
                    (None, None) => {
                        code.push_str(rest);
                        break;
                    }
                }
            }
            code
        })
        .collect()
}

/// `uniform float x = 1.0;` has no std140 equivalent.
fn has_initialiser(code: &str) -> bool {
    code.strip_prefix("uniform").is_some_and(|rest| {
        rest.starts_with(char::is_whitespace) && !rest.contains('{') && rest.contains('=')
    })
}

/// Parses `uniform <type> <name>[, <name>...];` with non-opaque types.
fn parse_uniform(code: &str) -> Option<Vec<UniformDecl>> {
    let rest = code.strip_prefix("uniform")?;
    if !rest.starts_with(char::is_whitespace) || rest.contains('{') {
        return None;
    }
    let body = rest.trim().strip_suffix(';')?.trim();

    let mut tokens = body
        .split_whitespace()
        .filter(|token| !PRECISION_QUALIFIERS.contains(token));
    let ty = tokens.next()?;
    if OPAQUE_TYPE_PREFIXES
        .iter()
        .any(|prefix| ty.starts_with(prefix))
    {
        return None;
    }

    let names: String = tokens.collect::<Vec<_>>().join(" ");
    let decls = names
        .split(',')
        .map(str::trim)
        .filter(|declarator| !declarator.is_empty())
        .map(|declarator| {
            split_declarator(declarator).map(|(name, array)| UniformDecl {
                ty: format!("{ty}{array}"),
                name: name.to_string(),
            })
        })
        .collect::<Option<Vec<_>>>()?;
    if decls.is_empty() {
        return None;
    }
    Some(decls)
}

/// Splits `name` or `name[N]` into the identifier and its array suffix.
fn split_declarator(declarator: &str) -> Option<(&str, String)> {
    let Some(open) = declarator.find('[') else {
        return is_identifier(declarator).then(|| (declarator, String::new()));
    };
    let name = declarator[..open].trim();
    let size = declarator[open..]
        .strip_prefix('[')?
        .strip_suffix(']')?
        .trim();
    let sized = !size.is_empty() && size.chars().all(|c| c.is_ascii_digit());
    (is_identifier(name) && sized).then(|| (name, format!("[{size}]")))
}

/// Parses `[layout(location = N)] [qualifiers] in|out <type> <name>;`.
fn parse_interface(code: &str) -> Option<InterfaceDecl<'_>> {
    let body = code.strip_suffix(';')?.trim();
    if body.contains('{') || body.contains('[') {
        return None;
    }

    let (location, rest) = match body.strip_prefix("layout") {
        Some(layout) => {
            let layout = layout.trim_start().strip_prefix('(')?;
            let close = layout.find(')')?;
            (parse_location(&layout[..close]), &layout[close + 1..])
        }
        None => (None, body),
    };
    if rest.contains('(') {
        return None;
    }

    let mut tokens = rest
        .split_whitespace()
        .filter(|token| {
            !INTERPOLATION_QUALIFIERS.contains(token) && !PRECISION_QUALIFIERS.contains(token)
        });
    let direction = match tokens.next()? {
        "in" => Direction::In,
        "out" => Direction::Out,
        _ => return None,
    };
    let _ty = tokens.next()?;
    let name = tokens.next()?;
    if tokens.next().is_some() || !is_identifier(name) {
        return None;
    }

    Some(InterfaceDecl {
        direction,
        location,
        name,
    })
}

fn parse_location(layout: &str) -> Option<u32> {
    layout.split(',').find_map(|qualifier| {
        let (key, value) = qualifier.split_once('=')?;
        if key.trim() == "location" {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
