//! GLSL declaration scanner
//!
//! A real driver reports active uniforms and attributes after linking. The
//! headless device has no driver, so it recovers the same information by
//! scanning top-level declarations:
//!
//! - `uniform <type> <name>;` free uniforms
//! - `uniform <Block> { <type> <name>; ... };` uniform blocks
//! - `in <type> <name>;` vertex stage attributes
//!
//! Comments, preprocessor lines and `layout(...)` qualifiers are skipped.
//! Function bodies are ignored.

use crate::render::resources::shader::{AttributeDecl, ProgramInterface, UniformDecl};
use crate::render::resources::uniform::UniformType;

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' && chars.peek() == Some(&'/') {
            for c in chars.by_ref() {
                if c == '\n' {
                    out.push('\n');
                    break;
                }
            }
        } else if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut previous = '\0';
            for c in chars.by_ref() {
                if previous == '*' && c == '/' {
                    break;
                }
                previous = c;
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for line in strip_comments(source).lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let mut current = String::new();
        for c in line.chars() {
            if c.is_whitespace() || "{}();,[]=".contains(c) {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                if !c.is_whitespace() {
                    tokens.push(c.to_string());
                }
            } else {
                current.push(c);
            }
        }
        if !current.is_empty() {
            tokens.push(current);
        }
    }
    tokens
}

fn attribute_components(ty: &str) -> Option<u8> {
    match ty {
        "float" => Some(1),
        "vec2" => Some(2),
        "vec3" => Some(3),
        "vec4" => Some(4),
        _ => None,
    }
}

fn push_uniform(interface: &mut ProgramInterface, block: Option<&str>, ty: &str, name: &str) {
    let Some(ty) = UniformType::from_glsl(ty) else {
        log::debug!("Skipping uniform '{}' of unsupported type '{}'", name, ty);
        return;
    };
    let exists = interface
        .uniforms
        .iter()
        .any(|u| u.name == name && u.block.as_deref() == block);
    if !exists {
        interface.uniforms.push(UniformDecl { block: block.map(str::to_string), name: name.to_string(), ty });
    }
}

fn scan_stage(source: &str, interface: &mut ProgramInterface, collect_attributes: bool) {
    let tokens = tokenize(source);
    let mut depth = 0_usize;
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "{" => depth += 1,
            "}" => depth = depth.saturating_sub(1),
            "layout" if depth == 0 => {
                while i < tokens.len() && tokens[i] != ")" {
                    i += 1;
                }
            }
            "uniform" if depth == 0 => {
                i = scan_uniform(&tokens, i + 1, interface);
                continue;
            }
            "in" if depth == 0 && collect_attributes => {
                if let (Some(ty), Some(name)) = (tokens.get(i + 1), tokens.get(i + 2)) {
                    if let Some(components) = attribute_components(ty) {
                        interface.attributes.push(AttributeDecl { name: name.clone(), components });
                    }
                }
                i += 3;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
}

/// Scan one `uniform` declaration starting after the keyword, returning the index after it
fn scan_uniform(tokens: &[String], start: usize, interface: &mut ProgramInterface) -> usize {
    let (Some(first), Some(second)) = (tokens.get(start), tokens.get(start + 1)) else {
        return tokens.len();
    };
    if second != "{" {
        push_uniform(interface, None, first, second);
        return start + 2;
    }

    let block = first.as_str();
    let mut i = start + 2;
    while i + 1 < tokens.len() && tokens[i] != "}" {
        if tokens[i + 1] != ";" && tokens[i] != ";" {
            push_uniform(interface, Some(block), &tokens[i], &tokens[i + 1]);
            i += 2;
        } else {
            i += 1;
        }
    }
    i + 1
}

/// Recover the program interface from vertex and fragment sources
///
/// Uniforms keep declaration order, vertex stage first; a uniform declared
/// in both stages is listed once.
pub fn introspect(vertex: &str, fragment: &str) -> ProgramInterface {
    let mut interface = ProgramInterface::default();
    scan_stage(vertex, &mut interface, true);
    scan_stage(fragment, &mut interface, false);
    interface
}
