//! Structural pattern table for the mutation classifier.
//!
//! Patterns are anchored at the start of a (trimmed) line, case-sensitive,
//! and deliberately shallow: they recognize the declaration shapes of
//! TypeScript-flavored source without parsing it. A single line may hit
//! several patterns (`export function f()` is both a function and an
//! export).

use std::sync::LazyLock;

use regex::Regex;

/// Structural category a pattern hit maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Category {
    Function,
    Class,
    Import,
    Export,
    Type,
}

static FUNCTION_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(export\s+)?(async\s+)?function\s+[A-Za-z_$][A-Za-z0-9_$]*\s*\(")
        .expect("function declaration regex is valid")
});

static FUNCTION_ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(const|let)\s+[A-Za-z_$][A-Za-z0-9_$]*\s*=\s*(async\s*)?\([^)]*\)\s*(:[^=]*)?=>",
    )
    .expect("arrow function regex is valid")
});

static METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(async\s+)?[A-Za-z_$][A-Za-z0-9_$]*\s*\([^)]*\)\s*:\s*\S")
        .expect("method signature regex is valid")
});

static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(export\s+)?class\s+[A-Za-z_$][A-Za-z0-9_$]*")
        .expect("class declaration regex is valid")
});

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+.+\s+from\s+['"]"#).expect("import regex is valid")
});

static EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*export\s+(default|type|const|function|class)\b")
        .expect("export regex is valid")
});

static TYPE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(export\s+)?type\s+[A-Za-z_$][A-Za-z0-9_$]*\s*=")
        .expect("type alias regex is valid")
});

static INTERFACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(export\s+)?interface\s+[A-Za-z_$][A-Za-z0-9_$]*")
        .expect("interface regex is valid")
});

/// Returns every structural category the line matches.
pub(crate) fn categories_for(line: &str) -> Vec<Category> {
    let mut hits = Vec::new();
    if FUNCTION_DECL.is_match(line) || FUNCTION_ARROW.is_match(line) || METHOD.is_match(line) {
        hits.push(Category::Function);
    }
    if CLASS.is_match(line) {
        hits.push(Category::Class);
    }
    if IMPORT.is_match(line) {
        hits.push(Category::Import);
    }
    if EXPORT.is_match(line) {
        hits.push(Category::Export);
    }
    if TYPE_ALIAS.is_match(line) || INTERFACE.is_match(line) {
        hits.push(Category::Type);
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_declaration_forms() {
        assert!(categories_for("function hash(input) {").contains(&Category::Function));
        assert!(categories_for("  async function load() {").contains(&Category::Function));
        assert!(categories_for("export function hash(){}").contains(&Category::Function));
        assert!(categories_for("export async function run(a, b) {").contains(&Category::Function));
    }

    #[test]
    fn test_arrow_function_forms() {
        assert!(categories_for("const hash = (input) => digest(input)")
            .contains(&Category::Function));
        assert!(categories_for("let retry = async () => {").contains(&Category::Function));
        assert!(categories_for("export const format = (s: string): string => s.trim()")
            .contains(&Category::Function));
    }

    #[test]
    fn test_method_signature_form() {
        assert!(categories_for("  render(props: Props): Element {").contains(&Category::Function));
        assert!(categories_for("async fetchAll(): Promise<void> {").contains(&Category::Function));
    }

    #[test]
    fn test_class_and_interface_forms() {
        assert!(categories_for("class UserStore {").contains(&Category::Class));
        assert!(categories_for("export class UserStore extends Base {").contains(&Category::Class));
        assert!(categories_for("interface Props {").contains(&Category::Type));
        assert!(categories_for("export interface Props {").contains(&Category::Type));
        assert!(categories_for("type Handler = (e: Event) => void").contains(&Category::Type));
    }

    #[test]
    fn test_import_export_forms() {
        assert!(categories_for(r#"import { hash } from "./hash""#).contains(&Category::Import));
        assert!(categories_for("import * as path from 'path'").contains(&Category::Import));
        assert!(categories_for("export default router").contains(&Category::Export));
        assert!(categories_for("export const LIMIT = 10").contains(&Category::Export));
    }

    #[test]
    fn test_export_declaration_hits_both_categories() {
        let hits = categories_for("export function hash(){}");
        assert!(hits.contains(&Category::Function));
        assert!(hits.contains(&Category::Export));
    }

    #[test]
    fn test_plain_statements_match_nothing() {
        assert!(categories_for("let x = 1").is_empty());
        assert!(categories_for("return value;").is_empty());
        assert!(categories_for("// comment").is_empty());
        assert!(categories_for("}").is_empty());
    }
}
