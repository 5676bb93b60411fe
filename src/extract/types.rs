//! Canonical type spelling for C and C++ declarations
//!
//! Declarations are folded into a small type model and printed the way a
//! compiler front end prints canonical types: qualifiers ahead of the base,
//! `*`/`&` after it, inner parentheses for pointers to functions and arrays,
//! typedef names replaced by what they stand for.

use super::code::Language;
use std::collections::{BTreeMap, HashMap};
use tree_sitter::Node;

/// cv-qualifiers (plus C `restrict`) attached to one level of a type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_restrict: bool,
}

impl Qualifiers {
    fn is_empty(&self) -> bool {
        !(self.is_const || self.is_volatile || self.is_restrict)
    }

    fn merge(self, other: Qualifiers) -> Qualifiers {
        Qualifiers {
            is_const: self.is_const || other.is_const,
            is_volatile: self.is_volatile || other.is_volatile,
            is_restrict: self.is_restrict || other.is_restrict,
        }
    }

    fn add_keyword(&mut self, keyword: &str) {
        match keyword {
            "const" => self.is_const = true,
            "volatile" => self.is_volatile = true,
            "restrict" | "__restrict" | "__restrict__" => self.is_restrict = true,
            _ => {}
        }
    }

    fn spelling(&self, language: Language) -> String {
        let mut words = Vec::new();
        if self.is_const {
            words.push("const");
        }
        if self.is_volatile {
            words.push("volatile");
        }
        if self.is_restrict {
            words.push(match language {
                Language::C => "restrict",
                Language::Cpp => "__restrict",
            });
        }
        words.join(" ")
    }
}

/// Structural type model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CType {
    Named {
        name: String,
        quals: Qualifiers,
    },
    Pointer {
        pointee: Box<CType>,
        quals: Qualifiers,
    },
    Reference {
        referent: Box<CType>,
        rvalue: bool,
    },
    Array {
        element: Box<CType>,
        size: Option<String>,
    },
    Function {
        ret: Box<CType>,
        params: Vec<CType>,
        variadic: bool,
        /// False only for C `()` declarations without a parameter list
        prototyped: bool,
    },
}

impl CType {
    pub fn named(name: impl Into<String>) -> Self {
        CType::Named {
            name: name.into(),
            quals: Qualifiers::default(),
        }
    }

    pub fn pointer_to(pointee: CType) -> Self {
        CType::Pointer {
            pointee: Box::new(pointee),
            quals: Qualifiers::default(),
        }
    }

    /// Add qualifiers to the outermost level. Qualifying an array qualifies
    /// its elements; functions and references ignore qualifiers.
    pub fn qualified(self, extra: Qualifiers) -> Self {
        if extra.is_empty() {
            return self;
        }
        match self {
            CType::Named { name, quals } => CType::Named {
                name,
                quals: quals.merge(extra),
            },
            CType::Pointer { pointee, quals } => CType::Pointer {
                pointee,
                quals: quals.merge(extra),
            },
            CType::Array { element, size } => CType::Array {
                element: Box::new(element.qualified(extra)),
                size,
            },
            other => other,
        }
    }

    /// Parameter adjustment: arrays and functions decay to pointers
    pub fn adjusted_parameter(self) -> Self {
        match self {
            CType::Array { element, .. } => CType::Pointer {
                pointee: element,
                quals: Qualifiers::default(),
            },
            function @ CType::Function { .. } => CType::pointer_to(function),
            other => other,
        }
    }

    /// Canonical spelling, e.g. `const char *` or `int (*)(int, int)`
    pub fn spelling(&self, language: Language) -> String {
        self.spell_around(String::new(), language)
    }

    fn spell_around(&self, inner: String, language: Language) -> String {
        match self {
            CType::Named { name, quals } => {
                let mut out = quals.spelling(language);
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(name);
                if !inner.is_empty() {
                    out.push(' ');
                    out.push_str(&inner);
                }
                out
            }
            CType::Pointer { pointee, quals } => {
                let mut decl = String::from("*");
                if !quals.is_empty() {
                    decl.push_str(&quals.spelling(language));
                    if !inner.is_empty() {
                        decl.push(' ');
                    }
                }
                decl.push_str(&inner);
                pointee.spell_around(wrap_if_needed(pointee, decl), language)
            }
            CType::Reference { referent, rvalue } => {
                let mut decl = String::from(if *rvalue { "&&" } else { "&" });
                decl.push_str(&inner);
                referent.spell_around(wrap_if_needed(referent, decl), language)
            }
            CType::Array { element, size } => {
                let decl = format!("{}[{}]", inner, size.as_deref().unwrap_or(""));
                element.spell_around(decl, language)
            }
            CType::Function {
                ret,
                params,
                variadic,
                prototyped,
            } => {
                let mut list: Vec<String> = params.iter().map(|p| p.spelling(language)).collect();
                if *variadic {
                    list.push("...".to_string());
                }
                let params = if list.is_empty() && *prototyped && language == Language::C {
                    "void".to_string()
                } else {
                    list.join(", ")
                };
                ret.spell_around(format!("{}({})", inner, params), language)
            }
        }
    }
}

fn wrap_if_needed(target: &CType, decl: String) -> String {
    match target {
        CType::Array { .. } | CType::Function { .. } => format!("({})", decl),
        _ => decl,
    }
}

/// Fold a multi-word builtin (`long unsigned int`) into its canonical name
pub fn canonical_builtin(text: &str) -> String {
    let mut unsigned = false;
    let mut signed = false;
    let mut short = false;
    let mut longs = 0;
    let mut base: Option<&str> = None;

    for word in text.split_whitespace() {
        match word {
            "unsigned" => unsigned = true,
            "signed" | "__signed" | "__signed__" => signed = true,
            "short" => short = true,
            "long" => longs += 1,
            "int" => {}
            other => base = Some(other),
        }
    }

    match base {
        Some("char") if unsigned => "unsigned char".to_string(),
        Some("char") if signed => "signed char".to_string(),
        Some("double") if longs > 0 => "long double".to_string(),
        Some(other) if unsigned => format!("unsigned {}", other),
        Some(other) => other.to_string(),
        None => {
            let core = if short {
                "short"
            } else if longs >= 2 {
                "long long"
            } else if longs == 1 {
                "long"
            } else {
                "int"
            };
            if unsigned {
                format!("unsigned {}", core)
            } else {
                core.to_string()
            }
        }
    }
}

/// Collapse whitespace in a source spelling and space commas the way
/// canonical spellings do (`std::map<int, int>`)
pub fn normalize_spelling(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());

    for ch in collapsed.chars() {
        match ch {
            ',' => {
                trim_trailing_space(&mut out);
                out.push_str(", ");
            }
            '>' | ')' | ']' => {
                trim_trailing_space(&mut out);
                out.push(ch);
            }
            ' ' if out.is_empty() || out.ends_with([' ', '<', '(', '[']) => {}
            _ => out.push(ch),
        }
    }

    trim_trailing_space(&mut out);
    out
}

fn trim_trailing_space(s: &mut String) {
    while s.ends_with(' ') {
        s.pop();
    }
}

/// Typedef names known without seeing their definition (LP64, glibc)
fn builtin_alias(name: &str, language: Language) -> Option<&'static str> {
    let spelled = match name {
        "size_t" | "uintptr_t" | "uintmax_t" | "uint64_t" | "uint_fast64_t" | "uint_least64_t" => {
            "unsigned long"
        }
        "ssize_t" | "ptrdiff_t" | "intptr_t" | "intmax_t" | "int64_t" | "int_fast64_t"
        | "int_least64_t" | "off_t" | "time_t" | "clock_t" | "suseconds_t" => "long",
        "int8_t" | "int_least8_t" | "int_fast8_t" => "signed char",
        "uint8_t" | "uint_least8_t" | "uint_fast8_t" => "unsigned char",
        "int16_t" | "int_least16_t" => "short",
        "uint16_t" | "uint_least16_t" => "unsigned short",
        "int32_t" | "int_least32_t" | "pid_t" => "int",
        "uint32_t" | "uint_least32_t" | "uid_t" | "gid_t" | "mode_t" | "socklen_t" => {
            "unsigned int"
        }
        "bool" if language == Language::C => "_Bool",
        "wchar_t" if language == Language::C => "int",
        "char16_t" if language == Language::C => "unsigned short",
        "char32_t" if language == Language::C => "unsigned int",
        "FILE" => match language {
            Language::C => "struct _IO_FILE",
            Language::Cpp => "_IO_FILE",
        },
        _ => return None,
    };
    Some(spelled)
}

/// Typedef names resolved for every file: configured overrides over the
/// built-in table
#[derive(Debug, Clone, Default)]
pub struct TypeAliases {
    overrides: HashMap<String, String>,
}

impl TypeAliases {
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        Self {
            overrides: overrides
                .iter()
                .map(|(k, v)| (k.clone(), normalize_spelling(v)))
                .collect(),
        }
    }

    pub fn resolve(&self, name: &str, language: Language) -> Option<String> {
        self.overrides
            .get(name)
            .cloned()
            .or_else(|| builtin_alias(name, language).map(str::to_string))
    }
}

/// Builds canonical types for the declarations of one file
pub struct TypeBuilder<'a> {
    language: Language,
    source: &'a [u8],
    aliases: &'a TypeAliases,
    local: HashMap<String, CType>,
}

impl<'a> TypeBuilder<'a> {
    pub fn new(language: Language, source: &'a [u8], aliases: &'a TypeAliases) -> Self {
        Self {
            language,
            source,
            aliases,
            local: HashMap::new(),
        }
    }

    fn text(&self, node: Node) -> Option<&'a str> {
        node.utf8_text(self.source).ok()
    }

    /// Record the names introduced by a top-level `typedef` or `using`
    pub fn register_alias(&mut self, node: Node) {
        match node.kind() {
            "type_definition" => {
                let Some(type_node) = node.child_by_field_name("type") else {
                    return;
                };
                let quals = qualifiers_of(node, self.source);
                let anonymous_tag = is_anonymous_tag(type_node);

                let mut cursor = node.walk();
                let declarators: Vec<Node> =
                    node.children_by_field_name("declarator", &mut cursor).collect();

                for declarator in declarators {
                    let base = if anonymous_tag {
                        // An unnamed struct is known by its typedef name
                        match innermost_name(declarator).and_then(|n| self.text(n)) {
                            Some(alias) => CType::named(alias),
                            None => continue,
                        }
                    } else {
                        match self.base_type(type_node) {
                            Some(base) => base,
                            None => continue,
                        }
                    };

                    if let Some((Some(name), ty)) = self.apply(Some(declarator), base.qualified(quals)) {
                        if let Some(alias) = self.text(name) {
                            self.local.insert(alias.to_string(), ty);
                        }
                    }
                }
            }
            "alias_declaration" => {
                let name = node.child_by_field_name("name").and_then(|n| self.text(n));
                let ty = node
                    .child_by_field_name("type")
                    .and_then(|t| self.type_descriptor(t));
                if let (Some(name), Some(ty)) = (name, ty) {
                    self.local.insert(name.to_string(), ty);
                }
            }
            _ => {}
        }
    }

    /// Type named by a declaration's specifiers and one of its declarators.
    ///
    /// Returns the node holding the declared name (if any) with the type.
    pub fn declared<'t>(
        &self,
        owner: Node<'t>,
        declarator: Option<Node<'t>>,
    ) -> Option<(Option<Node<'t>>, CType)> {
        let base = self.base_type(owner.child_by_field_name("type")?)?;
        self.apply(declarator, base.qualified(qualifiers_of(owner, self.source)))
    }

    fn type_descriptor(&self, node: Node) -> Option<CType> {
        self.declared(node, node.child_by_field_name("declarator"))
            .map(|(_, ty)| ty)
    }

    /// Base type of a type-specifier node, with typedefs resolved
    pub fn base_type(&self, node: Node) -> Option<CType> {
        let text = self.text(node)?;
        let ty = match node.kind() {
            "primitive_type" => self.resolve_name(text),
            "sized_type_specifier" => CType::named(canonical_builtin(text)),
            "type_identifier" => self.resolve_name(text),
            "struct_specifier" | "union_specifier" | "enum_specifier" | "class_specifier" => {
                let keyword = node.kind().trim_end_matches("_specifier");
                let name = node.child_by_field_name("name").and_then(|n| self.text(n));
                match (name, self.language) {
                    (Some(name), Language::C) => CType::named(format!("{} {}", keyword, name)),
                    (Some(name), Language::Cpp) => CType::named(normalize_spelling(name)),
                    (None, Language::C) => CType::named(format!("{} (unnamed)", keyword)),
                    (None, Language::Cpp) => CType::named(format!("(unnamed {})", keyword)),
                }
            }
            _ => CType::named(normalize_spelling(text)),
        };
        Some(ty)
    }

    fn resolve_name(&self, name: &str) -> CType {
        if let Some(ty) = self.local.get(name) {
            return ty.clone();
        }
        match self.aliases.resolve(name, self.language) {
            Some(spelled) => CType::named(spelled),
            None => CType::named(name),
        }
    }

    /// Wrap `ty` in the operators of a declarator chain, outermost first
    pub fn apply<'t>(
        &self,
        declarator: Option<Node<'t>>,
        ty: CType,
    ) -> Option<(Option<Node<'t>>, CType)> {
        let Some(node) = declarator else {
            return Some((None, ty));
        };

        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "operator_name"
            | "qualified_identifier" | "destructor_name" | "template_function" => {
                Some((Some(node), ty))
            }
            "pointer_declarator" | "abstract_pointer_declarator" => {
                let pointer = CType::Pointer {
                    pointee: Box::new(ty),
                    quals: qualifiers_of(node, self.source),
                };
                self.apply(node.child_by_field_name("declarator"), pointer)
            }
            "reference_declarator" | "abstract_reference_declarator" => {
                let mut cursor = node.walk();
                let rvalue = node.children(&mut cursor).any(|c| c.kind() == "&&");
                let reference = CType::Reference {
                    referent: Box::new(ty),
                    rvalue,
                };
                self.apply(inner_declarator(node), reference)
            }
            "array_declarator" | "abstract_array_declarator" => {
                let size = node
                    .child_by_field_name("size")
                    .and_then(|n| self.text(n))
                    .map(normalize_spelling);
                let array = CType::Array {
                    element: Box::new(ty),
                    size,
                };
                self.apply(node.child_by_field_name("declarator"), array)
            }
            "function_declarator" | "abstract_function_declarator" => {
                let ret = match trailing_return(node) {
                    Some(descriptor) => self.type_descriptor(descriptor)?,
                    None => ty,
                };
                let (params, variadic, prototyped) =
                    self.parameters(node.child_by_field_name("parameters")?)?;
                let function = CType::Function {
                    ret: Box::new(ret),
                    params,
                    variadic,
                    prototyped,
                };
                self.apply(node.child_by_field_name("declarator"), function)
            }
            "parenthesized_declarator"
            | "abstract_parenthesized_declarator"
            | "attributed_declarator"
            | "init_declarator" => self.apply(inner_declarator(node), ty),
            _ => None,
        }
    }

    /// Adjusted parameter types, variadic flag, prototyped flag
    fn parameters(&self, list: Node) -> Option<(Vec<CType>, bool, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;
        let mut explicit_void = false;

        let mut cursor = list.walk();
        for child in list.children(&mut cursor) {
            match child.kind() {
                "parameter_declaration" | "optional_parameter_declaration" => {
                    let declarator = child.child_by_field_name("declarator");
                    let (_, ty) = self.declared(child, declarator)?;
                    if declarator.is_none() && ty == CType::named("void") {
                        explicit_void = true;
                        continue;
                    }
                    params.push(ty.adjusted_parameter());
                }
                "variadic_parameter" | "..." | "variadic_parameter_declaration" => variadic = true,
                "(" | ")" | "," | "comment" => {}
                _ => return None,
            }
        }

        if explicit_void && (!params.is_empty() || variadic) {
            return None;
        }
        let prototyped =
            self.language == Language::Cpp || explicit_void || variadic || !params.is_empty();
        Some((params, variadic, prototyped))
    }
}

/// Collect `const`/`volatile`/`restrict` written as direct children
fn qualifiers_of(node: Node, source: &[u8]) -> Qualifiers {
    let mut quals = Qualifiers::default();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "type_qualifier" {
            if let Ok(text) = child.utf8_text(source) {
                quals.add_keyword(text.trim());
            }
        }
    }
    quals
}

fn inner_declarator(node: Node) -> Option<Node> {
    if let Some(inner) = node.child_by_field_name("declarator") {
        return Some(inner);
    }
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| {
        !matches!(
            c.kind(),
            "attribute_declaration" | "attribute_specifier" | "ms_call_modifier" | "type_qualifier"
                | "comment" | "gnu_asm_expression"
        )
    });
    found
}

fn trailing_return(function_declarator: Node) -> Option<Node> {
    let mut cursor = function_declarator.walk();
    let trailing = function_declarator
        .children(&mut cursor)
        .find(|c| c.kind() == "trailing_return_type")?;
    let mut inner = trailing.walk();
    let descriptor = trailing
        .named_children(&mut inner)
        .find(|c| c.kind() == "type_descriptor");
    descriptor
}

fn is_anonymous_tag(type_node: Node) -> bool {
    matches!(
        type_node.kind(),
        "struct_specifier" | "union_specifier" | "enum_specifier" | "class_specifier"
    ) && type_node.child_by_field_name("name").is_none()
}

/// Name node at the bottom of a declarator chain
pub fn innermost_name(declarator: Node) -> Option<Node> {
    match declarator.kind() {
        "identifier" | "field_identifier" | "type_identifier" | "operator_name"
        | "qualified_identifier" | "destructor_name" | "template_function" => Some(declarator),
        _ => innermost_name(inner_declarator(declarator)?),
    }
}
