//! Instruction normalization into vocabulary tokens.
//!
//! `mov qword [rbp - 0x18], 0x2a` becomes `X_mov_MEM_IMM`: memory operands
//! collapse to `MEM`, literals to `IMM`, registers and mnemonics are kept.

/// Architecture prefix for x86 tokens.
pub const ARCH_PREFIX: &str = "X_";

const MEMORY_TOKEN: &str = "MEM";
const IMMEDIATE_TOKEN: &str = "IMM";

/// Size qualifiers that may precede a memory operand.
const SIZE_QUALIFIERS: &[&str] =
    &["byte", "word", "dword", "qword", "tword", "xmmword", "ymmword", "zmmword", "ptr"];

/// Normalize one disassembled instruction. Returns `None` for blank input.
pub fn normalize_instruction(disasm: &str) -> Option<String> {
    let text = disasm.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    let (mnemonic, operands) = match text.split_once(char::is_whitespace) {
        Some((m, rest)) => (m.to_string(), rest.trim().to_string()),
        None => (text.clone(), String::new()),
    };

    let mut parts = vec![mnemonic];
    for operand in split_operands(&operands) {
        parts.push(normalize_operand(&operand));
    }
    Some(format!("{}{}", ARCH_PREFIX, parts.join("_")))
}

/// Normalize every line, skipping blanks.
pub fn normalize_all<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    lines.into_iter().filter_map(normalize_instruction).collect()
}

/// Split on top-level commas; commas inside `[...]` stay with their operand.
fn split_operands(operands: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in operands.chars() {
        match ch {
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    out.push(current);
    out.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn normalize_operand(operand: &str) -> String {
    if operand.contains('[') {
        return MEMORY_TOKEN.to_string();
    }
    let words: Vec<&str> =
        operand.split_whitespace().filter(|w| !SIZE_QUALIFIERS.contains(w)).collect();
    let joined = words.join("_");
    if is_immediate(&joined) {
        IMMEDIATE_TOKEN.to_string()
    } else {
        joined
    }
}

fn is_immediate(token: &str) -> bool {
    let token = token.strip_prefix('-').unwrap_or(token);
    if let Some(hex) = token.strip_prefix("0x") {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_are_kept() {
        assert_eq!(normalize_instruction("mov rax, rbx").as_deref(), Some("X_mov_rax_rbx"));
        assert_eq!(normalize_instruction("  RET ").as_deref(), Some("X_ret"));
    }

    #[test]
    fn memory_and_immediates_collapse() {
        assert_eq!(
            normalize_instruction("mov qword [rbp - 0x18], 0x2a").as_deref(),
            Some("X_mov_MEM_IMM")
        );
        assert_eq!(
            normalize_instruction("lea rdi, [rip + 0xe9c]").as_deref(),
            Some("X_lea_rdi_MEM")
        );
        assert_eq!(normalize_instruction("sub rsp, 16").as_deref(), Some("X_sub_rsp_IMM"));
        assert_eq!(normalize_instruction("add eax, -1").as_deref(), Some("X_add_eax_IMM"));
    }

    #[test]
    fn symbolic_call_targets_are_kept_verbatim() {
        assert_eq!(normalize_instruction("call sym.imp.puts").as_deref(), Some("X_call_sym.imp.puts"));
        assert_eq!(normalize_instruction("call 0x401000").as_deref(), Some("X_call_IMM"));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(normalize_instruction("   "), None);
        assert_eq!(normalize_all(["push rbp", "", "ret"]), vec!["X_push_rbp", "X_ret"]);
    }
}
