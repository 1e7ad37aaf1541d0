//! Statement splitting

/// Split comment-free SQL text into statements on the `;` terminator.
///
/// Each statement is trimmed; whitespace-only segments are dropped. Content
/// after the last terminator is emitted as a final statement. Order follows
/// the source, which execution relies on.
///
/// Like comment stripping, this does not look inside string literals.
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_with_trailing_terminator() {
        let stmts = split_statements("SELECT 1;\nSELECT 2;\n");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_with_dangling_content() {
        let stmts = split_statements("SELECT 1; SELECT 2; SELECT 3");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn test_split_drops_empty_statements() {
        let stmts = split_statements(";;\n  ;SELECT 1;  \n\t;");
        assert_eq!(stmts, vec!["SELECT 1"]);
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split_statements("").is_empty());
        assert!(split_statements("   \n ").is_empty());
    }

    #[test]
    fn test_split_preserves_inner_text() {
        let stmts = split_statements("INSERT INTO a.b.c\nVALUES (1,\n 2);");
        assert_eq!(stmts, vec!["INSERT INTO a.b.c\nVALUES (1,\n 2)"]);
    }

    #[test]
    fn test_semicolon_in_literal_splits() {
        let stmts = split_statements("SELECT 'a;b'");
        assert_eq!(stmts, vec!["SELECT 'a", "b'"]);
    }
}
