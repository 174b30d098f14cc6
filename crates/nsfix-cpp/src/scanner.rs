//! Scope scanner.
//!
//! Walks a token stream once and builds a [`FileModel`]: the tree of brace
//! scopes, the namespace-scope declarations and local bindings each scope
//! introduces, every using-statement, and every name chain that may refer
//! to something declared elsewhere.
//!
//! This is not a C++ parser. It classifies names with local heuristics that
//! hold for ordinary code:
//!
//! - A single identifier directly after a type (an identifier, a builtin
//!   type keyword, a closing template argument list, or a pointer/reference
//!   declarator) and followed by `= ; , ( ) [ { :` is being declared.
//! - Declarations at namespace scope become [`ScannedDecl`]s; everything
//!   declared inside classes and function bodies becomes a [`Binding`] that
//!   shadows namespace-scope names.
//! - Function parameters and template parameters are held back and bound
//!   in the body that follows.
//! - Names after `.`, `->` or a dependent `>::`, operator spellings, labels
//!   and attributes are never references.

use nsfix_core::adapter::{DeclKind, UsingKind};
use nsfix_core::patch::Span;
use nsfix_core::path::NamespacePath;

use crate::lexer::{tokenize, Token, TokenKind, TYPE_KEYWORDS};

/// Index into [`FileModel::scopes`].
pub type ScopeId = usize;

/// The translation unit's global scope.
pub const GLOBAL_SCOPE: ScopeId = 0;

/// Tokens that may follow a declarator name.
const DECLARATOR_FOLLOW: &[&str] = &["=", ";", ",", "(", ")", "[", "{", ":"];

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Namespace { inline: bool },
    Anonymous,
    /// `extern "C" { ... }`
    Extern,
    Class,
    Enum { scoped: bool },
    /// Function bodies, compound statements, braced initializers.
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Named namespaces enclosing this scope, inline and anonymous ones
    /// left out.
    pub path: NamespacePath,
    /// Opening brace through closing brace.
    pub span: Span,
}

impl Scope {
    /// True for scopes whose declarations are namespace members.
    pub fn is_namespace(&self) -> bool {
        matches!(
            self.kind,
            ScopeKind::Global | ScopeKind::Namespace { .. } | ScopeKind::Anonymous | ScopeKind::Extern
        )
    }
}

/// One `namespace name` as written in a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDef {
    /// Visible path of the enclosing namespace.
    pub parent: NamespacePath,
    pub name: String,
    pub inline: bool,
}

/// A declaration at namespace scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDecl {
    pub name: String,
    pub kind: DeclKind,
    pub scope: ScopeId,
    pub span: Span,
}

/// A name declared inside a class or block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub scope: ScopeId,
    pub offset: u64,
}

/// A using-directive, using-declaration or namespace alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedUsing {
    pub kind: UsingKind,
    pub scope: ScopeId,
    /// Offset of `using` or `namespace`.
    pub begin: u64,
    pub target_begin: u64,
    /// End of the last target token.
    pub decl_end: u64,
    /// The target was written with a leading `::`.
    pub global: bool,
    pub target: NamespacePath,
    /// Name introduced by a namespace alias.
    pub alias: Option<String>,
}

/// One identifier of a written name chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub span: Span,
    /// The `::` after this identifier, if the chain continues.
    pub separator: Option<Span>,
}

/// A name chain such as `std::chrono::seconds` that may be a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReference {
    pub global: Option<Span>,
    pub segments: Vec<Segment>,
    pub scope: ScopeId,
    /// Written directly after `const` or `volatile`.
    pub cv_qualified: bool,
    /// Written after `class`, `struct`, `union` or `enum`.
    pub elaborated: bool,
    token: usize,
}

impl RawReference {
    pub fn begin(&self) -> u64 {
        self.global
            .map(|g| g.start)
            .or_else(|| self.segments.first().map(|s| s.span.start))
            .unwrap_or(0)
    }

    pub fn span(&self) -> Span {
        let end = self.segments.last().map_or(self.begin(), |s| s.span.end);
        Span::new(self.begin(), end)
    }
}

/// Everything the scanner learned about one file.
#[derive(Debug, Clone)]
pub struct FileModel {
    pub scopes: Vec<Scope>,
    pub namespaces: Vec<NamespaceDef>,
    pub decls: Vec<ScannedDecl>,
    pub bindings: Vec<Binding>,
    pub usings: Vec<ScannedUsing>,
    /// `namespace` keyword spans of anonymous namespaces.
    pub anon_namespaces: Vec<Span>,
    pub references: Vec<RawReference>,
    /// Scopes still open at end of file.
    pub unclosed: usize,
}

impl FileModel {
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    /// `id` and its enclosing scopes, innermost first.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), move |&s| self.scopes[s].parent)
    }

    /// Innermost scope whose braces contain `offset`.
    pub fn scope_at(&self, offset: u64) -> ScopeId {
        self.scopes
            .iter()
            .rposition(|s| s.span.start <= offset && offset < s.span.end)
            .unwrap_or(GLOBAL_SCOPE)
    }

    /// Nearest enclosing scope that is a namespace; `extern` blocks are
    /// transparent.
    pub fn namespace_of(&self, id: ScopeId) -> ScopeId {
        self.ancestors(id)
            .find(|&s| {
                matches!(
                    self.scopes[s].kind,
                    ScopeKind::Global | ScopeKind::Namespace { .. } | ScopeKind::Anonymous
                )
            })
            .unwrap_or(GLOBAL_SCOPE)
    }

    /// True if `id` is, or is nested in, an anonymous namespace.
    pub fn in_anonymous(&self, id: ScopeId) -> bool {
        self.ancestors(id)
            .any(|s| self.scopes[s].kind == ScopeKind::Anonymous)
    }

    /// True if `name` is bound directly in `scope`.
    pub fn binds(&self, scope: ScopeId, name: &str) -> bool {
        self.bindings
            .iter()
            .any(|b| b.scope == scope && b.name == name)
    }
}

/// Tokenize and scan `source`.
pub fn scan(source: &str) -> FileModel {
    Scanner::new(source).run()
}

// ============================================================================
// Scanner
// ============================================================================

/// Per-brace parse state.
#[derive(Debug, Clone)]
struct Frame {
    scope: ScopeId,
    paren: usize,
    /// Index of an open `typedef` keyword.
    typedef_start: Option<usize>,
    /// Paren depth of the declaration statement in progress, for
    /// `int a, b;` continuations.
    declaring: Option<usize>,
    /// An enumerator name is expected next.
    enum_item: bool,
}

impl Frame {
    fn new(scope: ScopeId, enum_item: bool) -> Self {
        Frame {
            scope,
            paren: 0,
            typedef_start: None,
            declaring: None,
            enum_item,
        }
    }
}

/// What the next `{` opens.
#[derive(Debug, Clone)]
enum Pending {
    Namespace(Vec<(String, bool)>),
    Anonymous(Span),
    Extern,
    Class,
    Enum { scoped: bool },
}

/// A chain of `ident (:: ident)*` with an optional leading `::`.
#[derive(Debug, Clone)]
struct Chain {
    global: Option<Span>,
    segments: Vec<Segment>,
    /// Token index just past the chain.
    end: usize,
}

impl Chain {
    fn is_single(&self) -> bool {
        self.global.is_none() && self.segments.len() == 1
    }

    fn path(&self) -> NamespacePath {
        NamespacePath::from_segments(self.segments.iter().map(|s| s.text.clone()))
    }

    fn span(&self) -> Span {
        let start = self
            .global
            .map(|g| g.start)
            .or_else(|| self.segments.first().map(|s| s.span.start))
            .unwrap_or(0);
        let end = self.segments.last().map_or(start, |s| s.span.end);
        Span::new(start, end)
    }
}

struct Scanner<'s> {
    toks: Vec<Token<'s>>,
    source_len: u64,
    model: FileModel,
    frames: Vec<Frame>,
    pending: Option<Pending>,
    /// Parameters waiting for the body they belong to.
    pending_bindings: Vec<(String, u64)>,
    i: usize,
}

impl<'s> Scanner<'s> {
    fn new(source: &'s str) -> Self {
        let source_len = source.len() as u64;
        let global = Scope {
            kind: ScopeKind::Global,
            parent: None,
            path: NamespacePath::global(),
            span: Span::new(0, source_len.saturating_add(1)),
        };
        Scanner {
            toks: tokenize(source),
            source_len,
            model: FileModel {
                scopes: vec![global],
                namespaces: Vec::new(),
                decls: Vec::new(),
                bindings: Vec::new(),
                usings: Vec::new(),
                anon_namespaces: Vec::new(),
                references: Vec::new(),
                unclosed: 0,
            },
            frames: vec![Frame::new(GLOBAL_SCOPE, false)],
            pending: None,
            pending_bindings: Vec::new(),
            i: 0,
        }
    }

    fn run(mut self) -> FileModel {
        while self.i < self.toks.len() {
            let tok = self.toks[self.i];
            match tok.kind {
                TokenKind::Keyword => self.keyword(tok),
                TokenKind::Ident | TokenKind::Scope => self.name(),
                TokenKind::Punct => self.punct(tok),
                TokenKind::Number | TokenKind::Literal => self.i += 1,
            }
        }
        self.model.unclosed = self.frames.len() - 1;
        self.model
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn tok(&self, index: usize) -> Option<Token<'s>> {
        self.toks.get(index).copied()
    }

    fn prev(&self, index: usize) -> Option<Token<'s>> {
        index.checked_sub(1).and_then(|p| self.tok(p))
    }

    fn is_punct_at(&self, index: usize, text: &str) -> bool {
        self.tok(index).is_some_and(|t| t.is_punct(text))
    }

    fn frame(&self) -> &Frame {
        // the global frame is never popped
        &self.frames[self.frames.len() - 1]
    }

    fn frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn current_scope(&self) -> ScopeId {
        self.frame().scope
    }

    fn read_chain(&self, start: usize) -> Option<Chain> {
        let mut j = start;
        let global = match self.tok(j) {
            Some(t) if t.kind == TokenKind::Scope => {
                j += 1;
                Some(t.span())
            }
            _ => None,
        };
        let mut segments = Vec::new();
        while let Some(tok) = self.tok(j).filter(Token::is_ident) {
            let separator = self
                .tok(j + 1)
                .filter(|t| t.kind == TokenKind::Scope)
                .filter(|_| self.tok(j + 2).is_some_and(|t| t.is_ident()));
            segments.push(Segment {
                text: tok.text.to_string(),
                span: tok.span(),
                separator: separator.map(|s| s.span()),
            });
            if separator.is_none() {
                j += 1;
                break;
            }
            j += 2;
        }
        if segments.is_empty() {
            return None;
        }
        Some(Chain {
            global,
            segments,
            end: j,
        })
    }

    /// Skip `[[...]]`, `alignas(...)`, `__attribute__((...))` and
    /// `__declspec(...)` starting at `j`.
    fn skip_attributes(&self, mut j: usize) -> usize {
        loop {
            if self.is_punct_at(j, "[") && self.is_punct_at(j + 1, "[") {
                j = self.skip_group(j, "[", "]");
            } else if self.tok(j).is_some_and(|t| {
                t.is_keyword("alignas") || t.text == "__attribute__" || t.text == "__declspec"
            }) && self.is_punct_at(j + 1, "(")
            {
                j = self.skip_group(j + 1, "(", ")");
            } else {
                return j;
            }
        }
    }

    /// Index just past the bracket group opening at `j`.
    fn skip_group(&self, mut j: usize, open: &str, close: &str) -> usize {
        let mut depth = 0usize;
        while let Some(t) = self.tok(j) {
            if t.is_punct(open) {
                depth += 1;
            } else if t.is_punct(close) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return j + 1;
                }
            }
            j += 1;
        }
        j
    }

    /// True if the token at `index` can end a type, so an identifier after
    /// it is a declarator.
    fn ends_type(&self, index: usize) -> bool {
        let mut k = index;
        loop {
            let Some(t) = self.tok(k) else {
                return false;
            };
            match t.kind {
                TokenKind::Ident => return true,
                TokenKind::Keyword if TYPE_KEYWORDS.contains(&t.text) => return true,
                TokenKind::Keyword if t.text == "const" || t.text == "volatile" => {}
                TokenKind::Punct if t.text == "..." => return true,
                TokenKind::Punct if t.text == ">" => return self.closes_template(k),
                TokenKind::Punct if matches!(t.text, "*" | "&" | "&&") => {}
                _ => return false,
            }
            match k.checked_sub(1) {
                Some(p) => k = p,
                None => return false,
            }
        }
    }

    /// True if the `>` at `index` closes a template argument list.
    fn closes_template(&self, index: usize) -> bool {
        let mut depth = 0usize;
        let mut paren = 0usize;
        for k in (0..=index).rev() {
            let t = self.toks[k];
            if t.is_punct(")") {
                paren += 1;
            } else if t.is_punct("(") {
                if paren == 0 {
                    return false;
                }
                paren -= 1;
            } else if paren > 0 {
                continue;
            } else if t.is_punct(">") {
                depth += 1;
            } else if t.is_punct("<") {
                depth -= 1;
                if depth == 0 {
                    return self.prev(k).is_some_and(|p| p.is_ident());
                }
            } else if t.is_punct(";") || t.is_punct("{") || t.is_punct("}") {
                return false;
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    /// Record `name` as declared in the current frame.
    fn declare(&mut self, name: &str, kind: DeclKind, span: Span) {
        let frame = self.frame();
        let scope = frame.scope;
        let paren = frame.paren;
        let namespace = self.model.scopes[scope].is_namespace();
        if namespace && paren == 0 {
            self.model.decls.push(ScannedDecl {
                name: name.to_string(),
                kind,
                scope,
                span,
            });
        } else if paren > 0 && (namespace || self.model.scopes[scope].kind == ScopeKind::Class) {
            self.pending_bindings.push((name.to_string(), span.start));
        } else {
            self.model.bindings.push(Binding {
                name: name.to_string(),
                scope,
                offset: span.start,
            });
        }
    }

    fn push_reference(&mut self, chain: Chain, token: usize, elaborated: bool) {
        let cv_qualified = self
            .prev(token)
            .is_some_and(|p| p.is_keyword("const") || p.is_keyword("volatile"));
        self.model.references.push(RawReference {
            global: chain.global,
            segments: chain.segments,
            scope: self.current_scope(),
            cv_qualified,
            elaborated,
            token,
        });
    }

    fn record_using(&mut self, kind: UsingKind, keyword: Token<'_>, target: &Chain, alias: Option<String>) {
        let span = target.span();
        self.model.usings.push(ScannedUsing {
            kind,
            scope: self.current_scope(),
            begin: keyword.start as u64,
            target_begin: span.start,
            decl_end: span.end,
            global: target.global.is_some(),
            target: target.path(),
            alias,
        });
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn punct(&mut self, tok: Token<'s>) {
        match tok.text {
            "{" => self.open_brace(),
            "}" => self.close_brace(),
            ";" => self.end_statement(),
            "(" => {
                self.frame_mut().paren += 1;
                self.i += 1;
            }
            ")" => {
                let frame = self.frame_mut();
                frame.paren = frame.paren.saturating_sub(1);
                self.i += 1;
            }
            "[" if self.is_punct_at(self.i + 1, "[") => {
                self.i = self.skip_group(self.i, "[", "]");
            }
            "." | "->" | ".*" | "->*" => self.skip_member(),
            "~" if self.tok(self.i + 1).is_some_and(|t| t.is_ident())
                && self.is_punct_at(self.i + 2, "(") =>
            {
                // destructor name
                self.i += 2;
            }
            "," => {
                let enum_body = matches!(self.model.scopes[self.current_scope()].kind, ScopeKind::Enum { .. });
                let frame = self.frame_mut();
                if enum_body && frame.paren == 0 {
                    frame.enum_item = true;
                }
                self.i += 1;
            }
            _ => self.i += 1,
        }
    }

    fn keyword(&mut self, tok: Token<'s>) {
        match tok.text {
            "namespace" => self.namespace_definition(),
            "using" => self.using_statement(),
            "template" => self.template_parameters(),
            "class" | "struct" | "union" => self.class_head(),
            "enum" => self.enum_head(),
            "typedef" => {
                let start = self.i;
                self.frame_mut().typedef_start = Some(start);
                self.i += 1;
            }
            "operator" => self.skip_operator(),
            "extern" => {
                let linkage = self
                    .tok(self.i + 1)
                    .is_some_and(|t| t.kind == TokenKind::Literal);
                if linkage && self.is_punct_at(self.i + 2, "{") {
                    self.pending = Some(Pending::Extern);
                    self.i += 2;
                } else {
                    self.i += 1;
                }
            }
            "goto" => self.i += 2,
            "public" | "private" | "protected" if self.is_punct_at(self.i + 1, ":") => self.i += 2,
            _ => self.i += 1,
        }
    }

    // ------------------------------------------------------------------
    // Braces and statements
    // ------------------------------------------------------------------

    fn open_brace(&mut self) {
        let tok = self.toks[self.i];
        let parent = self.current_scope();
        let parent_path = self.model.scopes[parent].path.clone();
        let (kind, path) = match self.pending.take() {
            Some(Pending::Namespace(names)) => {
                let mut path = parent_path;
                let mut inline = false;
                for (name, is_inline) in names {
                    self.model.namespaces.push(NamespaceDef {
                        parent: path.clone(),
                        name: name.clone(),
                        inline: is_inline,
                    });
                    if !is_inline {
                        path.push(name);
                    }
                    inline = is_inline;
                }
                (ScopeKind::Namespace { inline }, path)
            }
            Some(Pending::Anonymous(keyword)) => {
                self.model.anon_namespaces.push(keyword);
                (ScopeKind::Anonymous, parent_path)
            }
            Some(Pending::Extern) => (ScopeKind::Extern, parent_path),
            Some(Pending::Class) => (ScopeKind::Class, parent_path),
            Some(Pending::Enum { scoped }) => (ScopeKind::Enum { scoped }, parent_path),
            None => (ScopeKind::Block, parent_path),
        };

        let id = self.model.scopes.len();
        self.model.scopes.push(Scope {
            kind,
            parent: Some(parent),
            path,
            span: Span::new(tok.start as u64, self.source_len),
        });

        // `member{value}` in an initializer list is not the body
        let braced_init = kind == ScopeKind::Block && self.prev(self.i).is_some_and(|p| p.is_ident());
        if matches!(kind, ScopeKind::Block | ScopeKind::Class) && !braced_init {
            for (name, offset) in self.pending_bindings.drain(..) {
                self.model.bindings.push(Binding {
                    name,
                    scope: id,
                    offset,
                });
            }
        } else if !braced_init {
            self.pending_bindings.clear();
        }

        let enum_body = matches!(kind, ScopeKind::Enum { .. });
        self.frames.push(Frame::new(id, enum_body));
        self.i += 1;
    }

    fn close_brace(&mut self) {
        let end = self.toks[self.i].end as u64;
        if self.frames.len() > 1 {
            if let Some(frame) = self.frames.pop() {
                self.model.scopes[frame.scope].span.end = end;
            }
        }
        self.pending = None;
        self.i += 1;
    }

    fn end_statement(&mut self) {
        let semi = self.i;
        let frame = self.frame_mut();
        if frame.paren == 0 {
            let typedef_start = frame.typedef_start.take();
            frame.declaring = None;
            if let Some(start) = typedef_start {
                self.finish_typedef(start, semi);
            }
            self.pending = None;
            self.pending_bindings.clear();
        }
        self.i += 1;
    }

    /// Declare the name a completed `typedef` introduces.
    fn finish_typedef(&mut self, start: usize, semi: usize) {
        let Some(index) = self.typedef_name(start, semi) else {
            return;
        };
        let tok = self.toks[index];
        self.model.references.retain(|r| r.token != index);
        self.declare(tok.text, DeclKind::TypeAlias, tok.span());
    }

    fn typedef_name(&self, start: usize, semi: usize) -> Option<usize> {
        // function pointer: typedef R (*Name)(Args);
        for k in start + 1..semi.saturating_sub(3) {
            if self.toks[k].is_punct("(")
                && self.toks[k + 1].is_punct("*")
                && self.toks[k + 2].is_ident()
                && self.toks[k + 3].is_punct(")")
            {
                return Some(k + 2);
            }
        }
        let mut depth = 0usize;
        for k in (start + 1..semi).rev() {
            let t = self.toks[k];
            if t.is_punct(")") || t.is_punct("]") || t.is_punct("}") {
                depth += 1;
            } else if t.is_punct("(") || t.is_punct("[") || t.is_punct("{") {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && t.is_ident() {
                return Some(k);
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    fn name(&mut self) {
        let start = self.i;
        let prev = self.prev(start);
        if self.toks[start].kind == TokenKind::Scope
            && prev.is_some_and(|p| p.is_ident() || p.is_punct(">") || p.is_punct(")") || p.is_punct("]"))
        {
            // `X<T>::type`, `decltype(e)::type`, `Foo::~Foo`
            self.skip_dependent_names();
            return;
        }
        let Some(chain) = self.read_chain(start) else {
            self.i = start + 1;
            return;
        };
        let next = self.tok(chain.end);
        self.i = chain.end;

        if chain.is_single() {
            if self.expects_enumerator() {
                self.declare_enumerator(&chain.segments[0]);
                return;
            }
            if self.is_label(prev, next) {
                return;
            }
            if self.is_declarator(start, prev, next) {
                let frame = self.frame();
                let in_typedef = frame.typedef_start.is_some();
                let paren = frame.paren;
                if !in_typedef {
                    let kind = if paren == 0 && next.is_some_and(|n| n.is_punct("(")) {
                        DeclKind::Function
                    } else {
                        DeclKind::Variable
                    };
                    let segment = &chain.segments[0];
                    self.declare(&segment.text, kind, segment.span);
                }
                self.frame_mut().declaring = Some(paren);
                return;
            }
        }
        self.push_reference(chain, start, false);
    }

    fn expects_enumerator(&self) -> bool {
        let frame = self.frame();
        frame.enum_item
            && frame.paren == 0
            && matches!(self.model.scopes[frame.scope].kind, ScopeKind::Enum { .. })
    }

    /// Enumerators of an unscoped enum belong to the enclosing scope.
    fn declare_enumerator(&mut self, segment: &Segment) {
        let frame = self.frame_mut();
        frame.enum_item = false;
        let scope = frame.scope;
        let ScopeKind::Enum { scoped } = self.model.scopes[scope].kind else {
            return;
        };
        if scoped {
            return;
        }
        let parent = self.model.scopes[scope].parent.unwrap_or(GLOBAL_SCOPE);
        if self.model.scopes[parent].is_namespace() {
            self.model.decls.push(ScannedDecl {
                name: segment.text.clone(),
                kind: DeclKind::Enumerator,
                scope: parent,
                span: segment.span,
            });
        } else {
            self.model.bindings.push(Binding {
                name: segment.text.clone(),
                scope: parent,
                offset: segment.span.start,
            });
        }
    }

    fn is_label(&self, prev: Option<Token<'_>>, next: Option<Token<'_>>) -> bool {
        next.is_some_and(|n| n.is_punct(":"))
            && self.model.scopes[self.current_scope()].kind == ScopeKind::Block
            && prev.is_none_or(|p| p.is_punct(";") || p.is_punct("{") || p.is_punct("}"))
    }

    fn is_declarator(&self, start: usize, prev: Option<Token<'_>>, next: Option<Token<'_>>) -> bool {
        let Some(next) = next else {
            return false;
        };
        if next.kind != TokenKind::Punct || !DECLARATOR_FOLLOW.contains(&next.text) {
            return false;
        }
        if prev.is_none() {
            return false;
        }
        // `int a, *b;`
        let mut k = start - 1;
        while k > 0 && matches!(self.toks[k].text, "*" | "&" | "&&") {
            k -= 1;
        }
        if self.toks[k].is_punct(",") {
            let frame = self.frame();
            return frame.declaring == Some(frame.paren);
        }
        self.ends_type(start - 1)
    }

    fn skip_member(&mut self) {
        let mut j = self.i + 1;
        if self.tok(j).is_some_and(|t| t.is_keyword("template")) {
            j += 1;
        }
        if self.is_punct_at(j, "~") {
            j += 1;
        }
        if self.tok(j).is_some_and(|t| t.is_ident()) {
            j += 1;
            while self.tok(j).is_some_and(|t| t.kind == TokenKind::Scope)
                && self.tok(j + 1).is_some_and(|t| t.is_ident())
            {
                j += 2;
            }
        }
        self.i = j;
    }

    fn skip_dependent_names(&mut self) {
        let mut j = self.i;
        while self.tok(j).is_some_and(|t| t.kind == TokenKind::Scope) {
            j += 1;
            if self.tok(j).is_some_and(|t| t.is_keyword("template")) {
                j += 1;
            }
            if self.is_punct_at(j, "~") {
                j += 1;
            }
            if self.tok(j).is_some_and(|t| t.is_ident()) {
                j += 1;
            } else {
                break;
            }
        }
        self.i = j;
    }

    fn skip_operator(&mut self) {
        let mut j = self.i + 1;
        match self.tok(j) {
            Some(t) if t.is_punct("(") && self.is_punct_at(j + 1, ")") => j += 2,
            Some(t) if t.kind == TokenKind::Punct => {
                while self
                    .tok(j)
                    .is_some_and(|t| t.kind == TokenKind::Punct && !t.is_punct("("))
                {
                    j += 1;
                }
            }
            Some(t) if t.kind == TokenKind::Literal => j += 1,
            // conversion operators name a type; scan it normally
            _ => {}
        }
        self.i = j;
    }

    // ------------------------------------------------------------------
    // Declarations with their own syntax
    // ------------------------------------------------------------------

    fn namespace_definition(&mut self) {
        let keyword = self.toks[self.i];
        let inline = self.prev(self.i).is_some_and(|p| p.is_keyword("inline"));
        let mut j = self.skip_attributes(self.i + 1);
        if self.is_punct_at(j, "{") {
            self.pending = Some(Pending::Anonymous(keyword.span()));
            self.i = j;
            return;
        }

        let mut names: Vec<(String, bool)> = Vec::new();
        loop {
            let nested_inline = self.tok(j).is_some_and(|t| t.is_keyword("inline"));
            if nested_inline {
                j += 1;
            }
            let Some(tok) = self.tok(j).filter(Token::is_ident) else {
                break;
            };
            let is_inline = nested_inline || (names.is_empty() && inline);
            names.push((tok.text.to_string(), is_inline));
            j += 1;
            if self.tok(j).is_some_and(|t| t.kind == TokenKind::Scope) {
                j += 1;
            } else {
                break;
            }
        }
        j = self.skip_attributes(j);

        if names.len() == 1 && self.is_punct_at(j, "=") {
            if let Some(target) = self.read_chain(j + 1) {
                let alias = names.pop().map(|(name, _)| name);
                self.record_using(UsingKind::NamespaceAlias, keyword, &target, alias);
                self.i = target.end;
                return;
            }
        }
        if !names.is_empty() && self.is_punct_at(j, "{") {
            self.pending = Some(Pending::Namespace(names));
        }
        self.i = j;
    }

    fn using_statement(&mut self) {
        let keyword = self.toks[self.i];
        let j = self.i + 1;
        let Some(next) = self.tok(j) else {
            self.i = j;
            return;
        };

        if next.is_keyword("namespace") {
            match self.read_chain(j + 1) {
                Some(target) => {
                    self.record_using(UsingKind::Directive, keyword, &target, None);
                    self.i = target.end;
                }
                None => self.i = j + 1,
            }
            return;
        }
        if next.is_ident() && self.is_punct_at(j + 1, "=") {
            // alias declaration; the right-hand side is scanned normally
            self.declare(next.text, DeclKind::TypeAlias, next.span());
            self.i = j + 2;
            return;
        }
        if next.is_keyword("enum") {
            self.i = j + 1;
            return;
        }

        let k = if next.is_keyword("typename") { j + 1 } else { j };
        match self.read_chain(k) {
            Some(target) if !target.is_single() => {
                self.record_using(UsingKind::Declaration, keyword, &target, None);
                self.i = target.end;
            }
            Some(target) => self.i = target.end,
            None => self.i = k,
        }
    }

    fn template_parameters(&mut self) {
        let open = self.i + 1;
        if !self.is_punct_at(open, "<") {
            self.i += 1;
            return;
        }
        let mut depth = 0usize;
        let mut paren = 0usize;
        let mut j = open;
        while let Some(t) = self.tok(j) {
            if t.is_punct("(") {
                paren += 1;
            } else if t.is_punct(")") {
                paren = paren.saturating_sub(1);
            } else if paren == 0 && t.is_punct("<") {
                depth += 1;
            } else if paren == 0 && t.is_punct(">") {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            } else if t.is_punct(";") || t.is_punct("{") {
                break;
            } else if depth == 1 && paren == 0 && t.is_ident() && self.is_template_parameter(j) {
                self.pending_bindings.push((t.text.to_string(), t.start as u64));
            }
            j += 1;
        }
        self.i = j + 1;
    }

    fn is_template_parameter(&self, j: usize) -> bool {
        let follows = self
            .tok(j + 1)
            .is_some_and(|n| n.is_punct(",") || n.is_punct(">") || n.is_punct("="));
        if !follows {
            return false;
        }
        self.prev(j)
            .is_some_and(|p| p.is_keyword("class") || p.is_keyword("typename"))
            || self.ends_type(j - 1)
    }

    fn class_head(&mut self) {
        let keyword = self.i;
        let friend = self.prev(keyword).is_some_and(|p| p.is_keyword("friend"));
        let j = self.skip_attributes(keyword + 1);

        let Some(mut name) = self.read_chain(j) else {
            // anonymous class
            if self.is_punct_at(j, "{") || self.is_punct_at(j, ":") {
                self.pending = Some(Pending::Class);
            }
            self.i = j;
            return;
        };
        let mut name_start = j;
        // `class EXPORT_MACRO Name {`
        loop {
            let after = self.skip_attributes(name.end);
            if let Some(candidate) = self.read_chain(after) {
                if self.opens_class_body(self.skip_attributes(candidate.end)) {
                    name = candidate;
                    name_start = after;
                    continue;
                }
            }
            break;
        }

        let after = self.skip_attributes(name.end);
        let forward = self.is_punct_at(after, ";");
        if friend || !(forward || self.opens_class_body(after)) {
            let end = name.end;
            self.push_reference(name, name_start, true);
            self.i = end;
            return;
        }
        if name.is_single() {
            let segment = &name.segments[0];
            let (text, span) = (segment.text.clone(), segment.span);
            self.declare(&text, DeclKind::Class, span);
        }
        if !forward {
            self.pending = Some(Pending::Class);
        }
        self.i = after;
    }

    fn opens_class_body(&self, j: usize) -> bool {
        self.tok(j).is_some_and(|t| {
            t.is_punct("{") || t.is_punct(":") || t.is_punct("<") || t.is_keyword("final")
        })
    }

    fn enum_head(&mut self) {
        let mut j = self.i + 1;
        let mut scoped = false;
        if self
            .tok(j)
            .is_some_and(|t| t.is_keyword("class") || t.is_keyword("struct"))
        {
            scoped = true;
            j += 1;
        }
        j = self.skip_attributes(j);
        let name = self.read_chain(j);
        let name_start = j;
        if let Some(chain) = &name {
            j = chain.end;
        }

        let body = self.is_punct_at(j, "{");
        let underlying = self.is_punct_at(j, ":");
        let opaque = self.is_punct_at(j, ";");
        if !(body || underlying || opaque) {
            if let Some(chain) = name {
                self.push_reference(chain, name_start, true);
            }
            self.i = j;
            return;
        }
        if let Some(chain) = name.filter(Chain::is_single) {
            let segment = &chain.segments[0];
            self.declare(&segment.text, DeclKind::Enum, segment.span);
        }
        if body || underlying {
            self.pending = Some(Pending::Enum { scoped });
        }
        // the underlying type after `:` is scanned normally
        self.i = if underlying { j + 1 } else { j };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl_names(model: &FileModel) -> Vec<(&str, DeclKind, String)> {
        model
            .decls
            .iter()
            .map(|d| (d.name.as_str(), d.kind, model.scope(d.scope).path.to_string()))
            .collect()
    }

    fn reference_texts(model: &FileModel) -> Vec<String> {
        model
            .references
            .iter()
            .map(|r| {
                let names: Vec<&str> = r.segments.iter().map(|s| s.text.as_str()).collect();
                let prefix = if r.global.is_some() { "::" } else { "" };
                format!("{prefix}{}", names.join("::"))
            })
            .collect()
    }

    fn binding_names(model: &FileModel) -> Vec<&str> {
        model.bindings.iter().map(|b| b.name.as_str()).collect()
    }

    mod scope_tests {
        use super::*;

        #[test]
        fn unclosed_scopes_are_counted() {
            assert_eq!(scan("namespace a { void f() {").unclosed, 2);
            assert_eq!(scan("namespace a { } }").unclosed, 0);
        }

        #[test]
        fn namespaces_build_visible_paths() {
            let src = "namespace a { namespace b::c { int x; } inline namespace v1 { int y; } }";
            let model = scan(src);
            assert_eq!(
                decl_names(&model),
                vec![
                    ("x", DeclKind::Variable, "a::b::c".to_string()),
                    ("y", DeclKind::Variable, "a".to_string()),
                ]
            );
            let defs: Vec<(String, &str, bool)> = model
                .namespaces
                .iter()
                .map(|d| (d.parent.to_string(), d.name.as_str(), d.inline))
                .collect();
            assert_eq!(
                defs,
                vec![
                    (String::new(), "a", false),
                    ("a".to_string(), "b", false),
                    ("a::b".to_string(), "c", false),
                    ("a".to_string(), "v1", true),
                ]
            );
        }

        #[test]
        fn anonymous_namespaces_are_recorded() {
            let src = "namespace {\nint helper;\n}\nint main() { return helper; }";
            let model = scan(src);
            assert_eq!(model.anon_namespaces, vec![Span::new(0, 9)]);
            let decl = &model.decls[0];
            assert_eq!(decl.name, "helper");
            assert!(model.in_anonymous(decl.scope));
            let offset = src.rfind("helper").expect("use") as u64;
            assert!(!model.in_anonymous(model.scope_at(offset)));
        }

        #[test]
        fn scope_at_finds_innermost() {
            let src = "namespace n { void f() { int x; } }";
            let model = scan(src);
            let offset = src.find("int x").expect("x") as u64;
            let scope = model.scope_at(offset);
            assert_eq!(model.scope(scope).kind, ScopeKind::Block);
            assert_eq!(model.scope(model.namespace_of(scope)).path.to_string(), "n");
        }

        #[test]
        fn extern_blocks_are_transparent() {
            let model = scan("extern \"C\" { int f(int a); }");
            assert_eq!(model.decls[0].name, "f");
            assert_eq!(model.namespace_of(model.decls[0].scope), GLOBAL_SCOPE);
        }
    }

    mod declaration_tests {
        use super::*;

        #[test]
        fn variables_and_functions() {
            let model = scan("std::string HELLO = \"hello\";\nvoid\nhello(const std::string &s)\n{\n}\n");
            assert_eq!(
                decl_names(&model),
                vec![
                    ("HELLO", DeclKind::Variable, String::new()),
                    ("hello", DeclKind::Function, String::new()),
                ]
            );
            assert_eq!(binding_names(&model), vec!["s"]);
        }

        #[test]
        fn declarator_lists() {
            let model = scan("int a = 1, b, *c;");
            let names: Vec<&str> = model.decls.iter().map(|d| d.name.as_str()).collect();
            assert_eq!(names, vec!["a", "b", "c"]);
        }

        #[test]
        fn call_arguments_are_not_declarators() {
            let model = scan("void f() { g(a, b); h(&cout); int r = k(x, y); }");
            assert_eq!(binding_names(&model), vec!["r"]);
            assert_eq!(reference_texts(&model), vec!["g", "a", "b", "h", "cout", "k", "x", "y"]);
        }

        #[test]
        fn templated_declarators() {
            let model = scan("void f() { std::vector<string> matches = g(); }");
            assert_eq!(binding_names(&model), vec!["matches"]);
            assert!(reference_texts(&model).contains(&"string".to_string()));
        }

        #[test]
        fn comparison_is_not_a_declarator() {
            let model = scan("void f() { if (a > max) {} }");
            assert!(binding_names(&model).is_empty());
            assert!(reference_texts(&model).contains(&"max".to_string()));
        }

        #[test]
        fn classes_and_forward_declarations() {
            let model = scan("class A;\nstruct EXPORT B : public Base { int m; };\nclass C final {};");
            let names: Vec<(&str, DeclKind)> = model.decls.iter().map(|d| (d.name.as_str(), d.kind)).collect();
            assert_eq!(
                names,
                vec![("A", DeclKind::Class), ("B", DeclKind::Class), ("C", DeclKind::Class)]
            );
            assert_eq!(binding_names(&model), vec!["m"]);
            assert_eq!(reference_texts(&model), vec!["Base"]);
        }

        #[test]
        fn elaborated_and_friend_references() {
            let model = scan("struct tm *t;\nclass F { friend class iterator_core_access; };");
            let elaborated: Vec<String> = model
                .references
                .iter()
                .filter(|r| r.elaborated)
                .map(|r| r.segments[0].text.clone())
                .collect();
            assert_eq!(elaborated, vec!["tm", "iterator_core_access"]);
            assert_eq!(model.decls.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(), vec!["t", "F"]);
        }

        #[test]
        fn unscoped_enumerators_join_the_enclosing_namespace() {
            let model = scan("enum E { A, B = A + 1 };\nenum class S : std::uint8_t { X };");
            let names: Vec<(&str, DeclKind)> = model.decls.iter().map(|d| (d.name.as_str(), d.kind)).collect();
            assert_eq!(
                names,
                vec![
                    ("E", DeclKind::Enum),
                    ("A", DeclKind::Enumerator),
                    ("B", DeclKind::Enumerator),
                    ("S", DeclKind::Enum),
                ]
            );
            let refs = reference_texts(&model);
            assert_eq!(refs, vec!["A", "std::uint8_t"]);
        }

        #[test]
        fn typedefs_declare_their_last_name() {
            let model = scan(
                "typedef unsigned long size_t;\ntypedef void (*Fn)(int a);\ntypedef struct { int x; } Pod;\ntypedef std::map<K, V> M;",
            );
            let names: Vec<&str> = model.decls.iter().map(|d| d.name.as_str()).collect();
            assert_eq!(names, vec!["size_t", "Fn", "Pod", "M"]);
            assert!(!reference_texts(&model).contains(&"Pod".to_string()));
        }

        #[test]
        fn typedef_in_class_is_a_binding() {
            let model = scan("class R { typedef TfNotice::_List _List; };");
            assert_eq!(binding_names(&model), vec!["_List"]);
            assert_eq!(reference_texts(&model), vec!["TfNotice::_List"]);
        }

        #[test]
        fn alias_declarations() {
            let model = scan("using _UniqueFILE = std::unique_ptr<FILE, _Fcloser>;");
            assert_eq!(model.decls[0].name, "_UniqueFILE");
            assert_eq!(model.decls[0].kind, DeclKind::TypeAlias);
            assert_eq!(reference_texts(&model), vec!["std::unique_ptr", "FILE", "_Fcloser"]);
        }

        #[test]
        fn template_parameters_bind_in_the_body() {
            let model = scan("template <class T, int N = 3>\nstruct F { T* New() { return &T::Get(); } };");
            let bound: Vec<(&str, ScopeKind)> = model
                .bindings
                .iter()
                .map(|b| (b.name.as_str(), model.scope(b.scope).kind))
                .collect();
            assert_eq!(
                bound,
                vec![("T", ScopeKind::Class), ("N", ScopeKind::Class), ("New", ScopeKind::Class)]
            );
        }

        #[test]
        fn range_for_binds_in_the_enclosing_block() {
            let model = scan("int main() { for (const string& k : {\"a\", \"b\"}) { (void)k; } }");
            assert_eq!(binding_names(&model), vec!["k"]);
            let string = &model.references[0];
            assert_eq!(string.segments[0].text, "string");
            assert!(string.cv_qualified);
        }
    }

    mod reference_tests {
        use super::*;

        #[test]
        fn qualified_chains_keep_separator_spans() {
            let src = "x = ::std::chrono::steady_clock::now();";
            let model = scan(src);
            let r = model
                .references
                .iter()
                .find(|r| r.global.is_some())
                .expect("global chain");
            assert_eq!(r.global, Some(Span::new(4, 6)));
            assert_eq!(r.segments.len(), 4);
            assert_eq!(r.segments[0].separator, Some(Span::new(9, 11)));
            assert_eq!(r.segments[3].separator, None);
            assert_eq!(r.span(), Span::new(4, 36));
        }

        #[test]
        fn member_access_and_dependent_names_are_skipped() {
            let model = scan("void f() { a.b(); p->c::d; typename X<T>::type y; decltype(e)::z w; }");
            assert_eq!(reference_texts(&model), vec!["a", "p", "X", "T", "e"]);
        }

        #[test]
        fn operators_labels_and_attributes_are_skipped() {
            let model = scan(
                "[[nodiscard]] bool operator==(const A& l, const A& r);\nvoid f() { again: goto again; }\nstruct S { operator string() const; };",
            );
            let refs = reference_texts(&model);
            assert_eq!(refs, vec!["A", "A", "string"]);
        }

        #[test]
        fn destructors_are_not_references() {
            let model = scan("Foo::~Foo() {}");
            assert_eq!(reference_texts(&model), vec!["Foo"]);
        }
    }

    mod using_tests {
        use super::*;

        #[test]
        fn directives_declarations_and_aliases() {
            let src = "using namespace std::chrono;\nusing std::pair;\nvoid f() { namespace ph = std::placeholders; }";
            let model = scan(src);
            let usings: Vec<(UsingKind, String, Option<&str>)> = model
                .usings
                .iter()
                .map(|u| (u.kind, u.target.to_string(), u.alias.as_deref()))
                .collect();
            assert_eq!(
                usings,
                vec![
                    (UsingKind::Directive, "std::chrono".to_string(), None),
                    (UsingKind::Declaration, "std::pair".to_string(), None),
                    (UsingKind::NamespaceAlias, "std::placeholders".to_string(), Some("ph")),
                ]
            );
            let first = &model.usings[0];
            assert_eq!((first.begin, first.target_begin, first.decl_end), (0, 16, 27));
            assert_eq!(model.scope(model.usings[2].scope).kind, ScopeKind::Block);
            assert!(model.references.is_empty());
        }

        #[test]
        fn global_targets_are_flagged() {
            let model = scan("using ::size_t;\nusing namespace ::boost;");
            assert!(model.usings.iter().all(|u| u.global));
            assert_eq!(model.usings[0].target.to_string(), "size_t");
        }
    }
}
