//! Commands: the statement layer around the expression parser.
//!
//! A script is a sequence of commands separated by `;` or line breaks.  A
//! line break inside brackets or braces, or right after an operator, does
//! not end a command.
//!
//! | Command | Form |
//! |---------|------|
//! | print | `print expr`, or `print` alone inside a loop |
//! | assignment | `x = expr`, `x += expr` (`-= *= /= %=`), `x++`, `x--` |
//! | condition | `if cond { } else if cond { } else { }` |
//! | loops | `n times { }`, `while cond { }`, `collection { }` |
//! | location | `inside path { }` |
//! | flow | `break`, `continue`, `exit`, `error [n]` |
//!
//! Every command is parsed before the first one runs, so a syntax error
//! anywhere means nothing is executed.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::env::Env;
use crate::error::{Error, Result};
use crate::lexer::tokenize;
use crate::script::context::{Context, FileContext};
use crate::script::definition::{DefPtr, Definition};
use crate::script::generator::GenPtr;
use crate::script::number::Number;
use crate::script::parse::{unresolved, Parser, Typed};
use crate::script::time::Time;
use crate::script::value::{Kind, Value};
use crate::token::{Keyword, NumberMode, Token, TokenKind, Tokens};
use crate::var::{var, Var, Variable};

// ── Command tree ─────────────────────────────────────────────────────────────

/// What iterates in a collection loop.
enum Source {
    /// `own` when the definition brings no file context and the loop loads
    /// attributes itself.
    Definition { def: DefPtr, own: bool },
    List(GenPtr<Vec<String>>),
    NumList(GenPtr<Vec<Number>>),
    TimeList(GenPtr<Vec<Time>>),
}

enum Command {
    Print(Typed),
    Assign { target: Variable, value: Typed },
    Block(Vec<Step>),
    If { branches: Vec<(GenPtr<bool>, Vec<Step>)>, otherwise: Vec<Step> },
    Times { count: GenPtr<Number>, index: Var<Number>, body: Vec<Step> },
    While { cond: GenPtr<bool>, index: Var<Number>, body: Vec<Step> },
    Loop { source: Source, ctx: Rc<FileContext>, body: Vec<Step> },
    Inside { location: Var<String>, path: GenPtr<String>, body: Vec<Step> },
    Break,
    Continue,
    Exit,
    Error(Option<GenPtr<Number>>),
}

struct Step {
    line: usize,
    command: Command,
}

/// How a command sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Break,
    Continue,
    /// `exit`, `error` or cancellation, with the exit status.
    Exit(i32),
}

// ── Statement splitting ──────────────────────────────────────────────────────

#[derive(Default)]
struct Depth {
    round: i32,
    square: i32,
    curly: i32,
}

impl Depth {
    fn refresh(&mut self, tok: &Token) -> Result<()> {
        match tok.symbol() {
            Some('(') => self.round += 1,
            Some(')') => self.round -= 1,
            Some('[') => self.square += 1,
            Some(']') => self.square -= 1,
            Some('{') => self.curly += 1,
            Some('}') => self.curly -= 1,
            _ => {}
        }
        if self.round < 0 || self.square < 0 || self.curly < 0 {
            return Err(Error::syntax(format!("bracket '{}' is not opened", tok.origin), tok.line));
        }
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.round == 0 && self.square == 0 && self.curly == 0
    }
}

/// Tokens after which a line break continues the command.
fn continues(tok: &Token) -> bool {
    if let Some(c) = tok.symbol() {
        return !matches!(c, ')' | ']' | '}');
    }
    match tok.keyword() {
        Some(kw) => kw.is_filter() || kw.is_logic() || matches!(kw, Keyword::In | Keyword::Like | Keyword::By | Keyword::Else),
        None => false,
    }
}

/// Tokens before which a line break continues the command.
fn continued_by(tok: &Token) -> bool {
    tok.is_symbol('{')
        || tok.keyword().is_some_and(|kw| kw.is_filter() || matches!(kw, Keyword::And | Keyword::Or | Keyword::Xor | Keyword::Else))
}

fn statements(t: Tokens<'_>) -> Result<Vec<Tokens<'_>>> {
    let mut out = Vec::new();
    let mut depth = Depth::default();
    let mut start = 0;
    for i in 0..t.len() {
        let tok = t.at(i);
        if depth.is_zero() && tok.is_symbol(';') {
            if i > start {
                out.push(t.slice(start, i));
            }
            start = i + 1;
            continue;
        }
        depth.refresh(tok)?;
        if !depth.is_zero() || i + 1 >= t.len() {
            continue;
        }
        let next = t.at(i + 1);
        let ends = if tok.is_symbol('}') {
            !next.is_keyword(Keyword::Else)
        } else {
            // `x++` and `x--` end with an operator symbol
            let postfix = i > start && matches!(tok.symbol(), Some('+' | '-')) && t.at(i - 1).symbol() == tok.symbol();
            next.line > tok.line && (postfix || !continues(tok)) && !continued_by(next)
        };
        if ends {
            out.push(t.slice(start, i + 1));
            start = i + 1;
        }
    }
    if !depth.is_zero() {
        return Err(Error::syntax("bracket is not closed", t.last().line));
    }
    if start < t.len() {
        out.push(t.slice(start, t.len()));
    }
    Ok(out)
}

/// Index of the first top-level `{` and of its matching `}`.
fn block_bounds(t: Tokens<'_>) -> Result<Option<(usize, usize)>> {
    let mut depth = Depth::default();
    let mut open = None;
    for (i, tok) in t.iter().enumerate() {
        if open.is_none() && depth.is_zero() && tok.is_symbol('{') {
            open = Some(i);
        }
        depth.refresh(tok)?;
        if let Some(o) = open {
            if depth.is_zero() {
                return Ok(Some((o, i)));
            }
        }
    }
    Ok(None)
}

// ── Compilation ──────────────────────────────────────────────────────────────

struct Compiler {
    parser: Parser,
    loops: usize,
}

impl Compiler {
    /// Compile a block in its own variable scope.
    fn block(&mut self, t: Tokens<'_>) -> Result<Vec<Step>> {
        self.parser.ctx.push_scope();
        let steps = self.steps(t);
        self.parser.ctx.pop_scope();
        steps
    }

    fn steps(&mut self, t: Tokens<'_>) -> Result<Vec<Step>> {
        let mut steps = Vec::new();
        for s in statements(t)? {
            let command = self.command(s)?;
            steps.push(Step { line: s.line(), command });
        }
        Ok(steps)
    }

    fn command(&mut self, s: Tokens<'_>) -> Result<Command> {
        if s.first().is_keyword(Keyword::If) {
            return self.condition(s);
        }
        if let Some((open, close)) = block_bounds(s)? {
            if close + 1 != s.len() {
                return Err(Error::syntax(
                    format!("tokens after a block cannot be resolved: '{}'", s.slice(close + 1, s.len()).origin()),
                    s.at(close + 1).line,
                ));
            }
            return self.structure(s.slice(0, open), s.slice(open + 1, close));
        }
        self.simple(s)
    }

    fn simple(&mut self, s: Tokens<'_>) -> Result<Command> {
        let head = s.first();
        let rest = s.trim_left();
        let alone = |command: Command| {
            if rest.is_empty() {
                Ok(command)
            } else {
                Err(Error::syntax(format!("command '{}' takes no arguments", head.origin), head.line))
            }
        };
        match head.keyword() {
            Some(Keyword::Print) => return self.print(head, rest),
            Some(kw @ (Keyword::Break | Keyword::Continue)) => {
                if self.loops == 0 {
                    return Err(Error::syntax(
                        format!("command '{}' can be called only inside a loop", kw.name()),
                        head.line,
                    ));
                }
                return alone(if kw == Keyword::Break { Command::Break } else { Command::Continue });
            }
            Some(Keyword::Exit) => return alone(Command::Exit),
            Some(Keyword::Error) => {
                if rest.is_empty() {
                    return Ok(Command::Error(None));
                }
                return match self.parser.parse_number(rest)? {
                    Some(code) => Ok(Command::Error(Some(code))),
                    None => Err(Error::syntax("tokens after command 'error' cannot be resolved to a number", head.line)),
                };
            }
            _ => {}
        }
        if let Some(command) = self.assignment(s)? {
            return Ok(command);
        }
        Err(Error::syntax(format!("command '{}' cannot be resolved", s.origin()), s.line()))
    }

    fn print(&mut self, head: &Token, rest: Tokens<'_>) -> Result<Command> {
        if !rest.is_empty() {
            return match self.parser.parse_typed(rest)? {
                Some(typed) => Ok(Command::Print(typed)),
                None => Err(unresolved(rest)),
            };
        }
        if self.parser.ctx.file().is_none() {
            return Err(Error::syntax("command 'print' needs an argument outside of a loop", head.line));
        }
        let this = [Token::new(TokenKind::Word("this".into()), head.line, "this")];
        match self.parser.parse_typed(Tokens::new(&this))? {
            Some(typed) => Ok(Command::Print(typed)),
            None => Err(Error::syntax("command 'print' needs an argument outside of a loop", head.line)),
        }
    }

    fn assignment(&mut self, s: Tokens<'_>) -> Result<Option<Command>> {
        let head = s.first();
        let Some(name) = head.word() else {
            return Ok(None);
        };
        if s.len() < 2 {
            return Ok(None);
        }
        let op = s.second().symbol();
        let third = (s.len() > 2).then(|| s.at(2));
        // `x op= rhs` and `x++` are rewritten to `x = x op (rhs)`.
        let (compound, rhs): (Option<char>, Vec<Token>) = match op {
            Some('=') => (None, s.slice(2, s.len()).as_slice().to_vec()),
            Some(c @ ('+' | '-' | '*' | '/' | '%')) if third.is_some_and(|t| t.is_symbol('=')) => {
                (Some(c), s.slice(3, s.len()).as_slice().to_vec())
            }
            Some(c @ ('+' | '-')) if s.len() == 3 && third.is_some_and(|t| t.is_symbol(c)) => {
                let one = Token::new(TokenKind::Number(Number::Int(1), NumberMode::Normal), head.line, "1");
                (Some(c), vec![one])
            }
            _ => return Ok(None),
        };
        if rhs.is_empty() {
            return Err(Error::syntax(format!("right side of the assignment to '{name}' is empty"), head.line));
        }
        if self.parser.ctx.is_reserved(name) {
            return Err(Error::syntax(format!("variable '{name}' cannot be assigned"), head.line));
        }
        let existing = self.parser.ctx.variable(name).cloned();
        let tokens = match compound {
            None => rhs,
            Some(c) => {
                if existing.is_none() {
                    return Err(Error::syntax(format!("variable '{name}' does not exist"), head.line));
                }
                let mut v = Vec::with_capacity(rhs.len() + 4);
                v.push(head.clone());
                v.push(Token::new(TokenKind::Symbol(c), head.line, c.to_string()));
                v.push(Token::new(TokenKind::Symbol('('), head.line, "("));
                v.extend(rhs);
                v.push(Token::new(TokenKind::Symbol(')'), head.line, ")"));
                v
            }
        };
        let t = Tokens::new(&tokens);
        if let Some(target) = existing {
            let kind = target.kind();
            return match self.parser.parse_as(t, kind)? {
                Some(value) => Ok(Some(Command::Assign { target, value })),
                None => Err(Error::syntax(
                    format!("value of expression '{}' cannot be assigned to the {kind} variable '{name}'", t.origin()),
                    head.line,
                )),
            };
        }
        let Some(value) = self.parser.parse_typed(t)? else {
            return Err(unresolved(t));
        };
        let target = Variable::empty(value.kind());
        debug!(variable = name, kind = %target.kind(), "variable declared");
        self.parser.ctx.declare(name, target.clone());
        Ok(Some(Command::Assign { target, value }))
    }

    fn condition(&mut self, s: Tokens<'_>) -> Result<Command> {
        let mut branches = Vec::new();
        let mut rest = s;
        loop {
            let if_tok = rest.first();
            let Some((open, close)) = block_bounds(rest)? else {
                return Err(Error::syntax("keyword 'if' should be followed by a block", if_tok.line));
            };
            let cond_tokens = rest.slice(1, open);
            if cond_tokens.is_empty() {
                return Err(Error::syntax("condition of 'if' is empty", if_tok.line));
            }
            let Some(cond) = self.parser.parse_bool(cond_tokens)? else {
                return Err(Error::syntax(
                    format!("condition '{}' cannot be resolved to a boolean", cond_tokens.origin()),
                    if_tok.line,
                ));
            };
            let body = self.block(rest.slice(open + 1, close))?;
            branches.push((cond, body));

            let after = rest.slice(close + 1, rest.len());
            if after.is_empty() {
                return Ok(Command::If { branches, otherwise: Vec::new() });
            }
            let else_tok = after.first();
            if !else_tok.is_keyword(Keyword::Else) {
                return Err(Error::syntax(format!("tokens after a block cannot be resolved: '{}'", after.origin()), else_tok.line));
            }
            let tail = after.trim_left();
            if tail.is_empty() {
                return Err(Error::syntax("keyword 'else' should be followed by a block", else_tok.line));
            }
            if tail.first().is_keyword(Keyword::If) {
                rest = tail;
                continue;
            }
            match block_bounds(tail)? {
                Some((0, close)) if close + 1 == tail.len() => {
                    let otherwise = self.block(tail.slice(1, close))?;
                    return Ok(Command::If { branches, otherwise });
                }
                _ => return Err(Error::syntax("keyword 'else' should be followed by a block", else_tok.line)),
            }
        }
    }

    /// `head { body }` for every head but `if`.
    fn structure(&mut self, head: Tokens<'_>, body: Tokens<'_>) -> Result<Command> {
        if head.is_empty() {
            return Ok(Command::Block(self.block(body)?));
        }
        if head.last().is_keyword(Keyword::Times) {
            let n = head.trim_right();
            let Some(count) = self.parser.parse_number(n)? else {
                return Err(Error::syntax("tokens before keyword 'times' cannot be resolved to a number", head.line()));
            };
            let (index, body) = self.counted(|c| c.loop_body(body))?;
            return Ok(Command::Times { count, index, body });
        }
        let first = head.first();
        if first.is_keyword(Keyword::While) {
            let (index, (cond, body)) = self.counted(|c| {
                let Some(cond) = c.parser.parse_bool(head.trim_left())? else {
                    return Err(Error::syntax("tokens after keyword 'while' cannot be resolved to a boolean", first.line));
                };
                Ok((cond, c.loop_body(body)?))
            })?;
            return Ok(Command::While { cond, index, body });
        }
        if first.is_keyword(Keyword::Inside) {
            let Some(path) = self.parser.parse_string(head.trim_left())? else {
                return Err(Error::syntax("tokens after keyword 'inside' cannot be resolved to a string", first.line));
            };
            let path = self.parser.located(path);
            let location = var(String::new());
            self.parser.ctx.push_location(location.clone());
            let steps = self.block(body);
            self.parser.ctx.pop_location();
            return Ok(Command::Inside { location, path, body: steps? });
        }
        self.collection_loop(head, body)
    }

    fn collection_loop(&mut self, head: Tokens<'_>, body: Tokens<'_>) -> Result<Command> {
        let location = self.parser.ctx.location();
        let (source, ctx) = if let Some(def) = self.parser.attempt(|p| p.parse_definition(head))? {
            match def.file_context() {
                Some(ctx) => (Source::Definition { def, own: false }, ctx),
                None => (Source::Definition { def, own: true }, FileContext::for_paths(location)),
            }
        } else if let Some(list) = self.parser.attempt(|p| p.parse_numlist(head))? {
            let ctx = Rc::new(FileContext::new(Some(Variable::empty(Kind::Number)), location));
            (Source::NumList(list), ctx)
        } else if let Some(list) = self.parser.attempt(|p| p.parse_timelist(head))? {
            let ctx = Rc::new(FileContext::new(Some(Variable::empty(Kind::Time)), location));
            (Source::TimeList(list), ctx)
        } else if let Some(list) = self.parser.attempt(|p| p.parse_list(head))? {
            (Source::List(list), FileContext::for_paths(location))
        } else {
            return Err(Error::syntax(
                format!("expression '{}' before a block cannot be resolved to a collection", head.origin()),
                head.line(),
            ));
        };
        self.parser.ctx.push_file(ctx.clone());
        let body = self.loop_body(body);
        self.parser.ctx.pop_file();
        Ok(Command::Loop { source, ctx, body: body? })
    }

    /// Compile the parts of a loop whose only element is its iteration
    /// count, with `index` bound to that count.
    fn counted<T>(&mut self, compile: impl FnOnce(&mut Self) -> Result<T>) -> Result<(Var<Number>, T)> {
        let index = var(Number::Int(0));
        self.parser.ctx.push_index(index.clone());
        let compiled = compile(self);
        self.parser.ctx.pop_index();
        Ok((index, compiled?))
    }

    fn loop_body(&mut self, body: Tokens<'_>) -> Result<Vec<Step>> {
        self.loops += 1;
        let steps = self.block(body);
        self.loops -= 1;
        steps
    }
}

// ── Execution ────────────────────────────────────────────────────────────────

impl Flow {
    /// Inside a loop: `Some(flow)` ends the loop, continuing with `flow`.
    fn leaves_loop(self) -> Option<Flow> {
        match self {
            Flow::Break => Some(Flow::Next),
            Flow::Exit(code) => Some(Flow::Exit(code)),
            Flow::Next | Flow::Continue => None,
        }
    }
}

fn run_block(steps: &mut [Step], env: &Env) -> Result<Flow> {
    for step in steps.iter_mut() {
        if !env.is_running() {
            return Ok(Flow::Exit(0));
        }
        let line = step.line;
        let flow = step.command.run(env).map_err(|e| e.at_line(line))?;
        if flow != Flow::Next {
            return Ok(flow);
        }
    }
    Ok(Flow::Next)
}

fn print(typed: &mut Typed, env: &Env) -> Result<()> {
    match typed {
        Typed::Definition(d) => {
            let printed = print_each(d.as_mut(), env);
            d.reset();
            printed?
        }
        Typed::List(g) => g.value(env)?.iter().for_each(|s| env.printer.print(s)),
        Typed::NumList(g) => g.value(env)?.iter().for_each(|n| env.printer.print(&n.to_string())),
        Typed::TimeList(g) => g.value(env)?.iter().for_each(|t| env.printer.print(&t.to_string())),
        other => env.printer.print(&other.evaluate(env)?.to_string()),
    }
    Ok(())
}

fn print_each(def: &mut dyn Definition, env: &Env) -> Result<()> {
    while def.has_next(env)? {
        env.printer.print(&def.value());
    }
    Ok(())
}

impl Command {
    fn run(&mut self, env: &Env) -> Result<Flow> {
        match self {
            Command::Print(typed) => print(typed, env)?,
            Command::Assign { target, value } => {
                target.set(value.evaluate(env)?);
            }
            Command::Block(steps) => return run_block(steps, env),
            Command::If { branches, otherwise } => {
                for (cond, body) in branches.iter_mut() {
                    if cond.value(env)? {
                        return run_block(body, env);
                    }
                }
                return run_block(otherwise, env);
            }
            Command::Times { count, index, body } => {
                let n = count.value(env)?.to_int();
                for i in 0..n.max(0) {
                    *index.borrow_mut() = Number::Int(i);
                    if let Some(flow) = run_block(body, env)?.leaves_loop() {
                        return Ok(flow);
                    }
                }
            }
            Command::While { cond, index, body } => {
                let mut i = 0;
                loop {
                    *index.borrow_mut() = Number::Int(i);
                    if !env.is_running() {
                        return Ok(Flow::Exit(0));
                    }
                    if !cond.value(env)? {
                        break;
                    }
                    if let Some(flow) = run_block(body, env)?.leaves_loop() {
                        return Ok(flow);
                    }
                    i += 1;
                }
            }
            Command::Loop { source, ctx, body } => return run_loop(source, ctx, body, env),
            Command::Inside { location, path, body } => {
                let dir = path.value(env)?;
                trace!(location = %dir, "entering location");
                *location.borrow_mut() = dir;
                return run_block(body, env);
            }
            Command::Break => return Ok(Flow::Break),
            Command::Continue => return Ok(Flow::Continue),
            Command::Exit => {
                debug!("script exits");
                env.cancel.cancel();
                return Ok(Flow::Exit(0));
            }
            Command::Error(code) => {
                let code = match code {
                    Some(g) => {
                        let n = g.value(env)?.to_int();
                        i32::try_from(n).map_err(|_| Error::runtime(format!("exit code {n} is out of range")))?
                    }
                    None => 1,
                };
                debug!(code, "script stops with an error");
                env.cancel.cancel();
                return Ok(Flow::Exit(code));
            }
        }
        Ok(Flow::Next)
    }
}

fn run_loop(source: &mut Source, ctx: &FileContext, body: &mut [Step], env: &Env) -> Result<Flow> {
    match source {
        Source::Definition { def, own } => {
            let flow = definition_loop(def.as_mut(), *own, ctx, body, env);
            def.reset();
            return flow;
        }
        Source::List(g) => {
            for (i, item) in g.value(env)?.iter().enumerate() {
                ctx.set_index(i);
                ctx.load(item, env);
                if let Some(flow) = run_block(body, env)?.leaves_loop() {
                    return Ok(flow);
                }
            }
        }
        Source::NumList(g) => {
            for (i, n) in g.value(env)?.into_iter().enumerate() {
                ctx.set_index(i);
                ctx.set_this(Value::Number(n));
                if let Some(flow) = run_block(body, env)?.leaves_loop() {
                    return Ok(flow);
                }
            }
        }
        Source::TimeList(g) => {
            for (i, t) in g.value(env)?.into_iter().enumerate() {
                ctx.set_index(i);
                ctx.set_this(Value::Time(t));
                if let Some(flow) = run_block(body, env)?.leaves_loop() {
                    return Ok(flow);
                }
            }
        }
    }
    Ok(Flow::Next)
}

/// Run `body` for each element of `def`.  The caller resets `def` however
/// this ends.
fn definition_loop(def: &mut dyn Definition, own: bool, ctx: &FileContext, body: &mut [Step], env: &Env) -> Result<Flow> {
    let mut index = 0;
    while def.has_next(env)? {
        if own {
            ctx.load(&def.value(), env);
        }
        ctx.set_index(index);
        index += 1;
        if let Some(flow) = run_block(body, env)?.leaves_loop() {
            return Ok(flow);
        }
    }
    Ok(Flow::Next)
}

// ── Script ───────────────────────────────────────────────────────────────────

/// A parsed script, ready to run.
pub struct Script {
    steps: Vec<Step>,
    env: Env,
}

impl Script {
    /// Parse `src` whole.  `ctx` supplies the starting location, arguments
    /// and config constants; `env` is used for constant folding and later
    /// for running.
    pub fn parse(src: &str, ctx: Context, env: Env) -> Result<Script> {
        let tokens = tokenize(src)?;
        let mut compiler = Compiler { parser: Parser::new(ctx, env.clone()), loops: 0 };
        let steps = compiler.block(Tokens::new(&tokens))?;
        debug!(commands = steps.len(), "script parsed");
        Ok(Script { steps, env })
    }

    /// Run to the end, an `exit` or an `error`.  Returns the exit status:
    /// `0`, or the code of the `error` command.
    pub fn run(&mut self) -> Result<i32> {
        self.env.cancel.reset();
        match run_block(&mut self.steps, &self.env)? {
            Flow::Exit(code) => Ok(code),
            _ => Ok(0),
        }
    }
}

impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script").field("commands", &self.steps.len()).finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
