//! Function calls.
//!
//! Every kind parser hands a `name(args)` window to its own dispatcher
//! here.  A dispatcher answers `Ok(None)` for names of another kind, so
//! `first(list)` and `first(numbers)` resolve by argument kind.  Once a
//! name is claimed, a wrong argument count or kind is an error.

use tracing::trace;

use crate::env::Env;
use crate::error::{Error, Result};
use crate::os;
use crate::script::definition::{self, DefPtr};
use crate::script::function::{self as f, ordinal};
use crate::script::generator::{func1, func2, func3, func_n, env_func, GenPtr, Generator};
use crate::script::number::Number;
use crate::script::parse::{check_comma_ambiguity, Parser};
use crate::script::time::Time;
use crate::script::value::Kind;
use crate::token::Tokens;
use crate::var::{var, Var, Variable};

type Parse<T> = fn(&mut Parser, Tokens<'_>) -> Result<Option<GenPtr<T>>>;

struct Call<'a> {
    name: &'a str,
    line: usize,
    args: Vec<Tokens<'a>>,
}

impl Call<'_> {
    fn expect(&self, counts: &[usize]) -> Result<()> {
        if counts.contains(&self.args.len()) {
            Ok(())
        } else {
            Err(f::arg_count_error(self.name, self.args.len(), self.line))
        }
    }
}

/// Split `name(args)`.  An unknown name is an error for every kind.
fn call(t: Tokens<'_>) -> Result<Option<Call<'_>>> {
    let tok = t.first();
    let Some(name) = tok.word() else {
        return Ok(None);
    };
    if !f::exists(name) {
        return Err(f::unknown_function(&tok.origin, tok.line));
    }
    let args = t.function_args()?;
    if let Some((_, leading)) = args.split_last() {
        for arg in leading {
            check_comma_ambiguity(name, tok.line, *arg)?;
        }
    }
    trace!(function = name, args = args.len(), "function call");
    Ok(Some(Call { name, line: tok.line, args }))
}

// ── Collection nodes ─────────────────────────────────────────────────────────

enum Collection {
    Definition(DefPtr),
    List(GenPtr<Vec<String>>),
    NumList(GenPtr<Vec<Number>>),
    TimeList(GenPtr<Vec<Time>>),
}

impl Collection {
    fn count(&mut self, env: &Env) -> Result<usize> {
        Ok(match self {
            Collection::Definition(d) => definition::count(d.as_mut(), env)?,
            Collection::List(g) => g.value(env)?.len(),
            Collection::NumList(g) => g.value(env)?.len(),
            Collection::TimeList(g) => g.value(env)?.len(),
        })
    }

    fn any(&mut self, env: &Env) -> Result<bool> {
        Ok(match self {
            Collection::Definition(d) => {
                let any = d.has_next(env);
                d.reset();
                any?
            }
            Collection::List(g) => !g.value(env)?.is_empty(),
            Collection::NumList(g) => !g.value(env)?.is_empty(),
            Collection::TimeList(g) => !g.value(env)?.is_empty(),
        })
    }

    fn is_constant(&self) -> bool {
        match self {
            Collection::Definition(_) => false,
            Collection::List(g) => g.is_constant(),
            Collection::NumList(g) => g.is_constant(),
            Collection::TimeList(g) => g.is_constant(),
        }
    }
}

/// `count(a, b, ...)`.
struct Count(Vec<Collection>);

impl Generator<Number> for Count {
    fn value(&mut self, env: &Env) -> Result<Number> {
        let mut total = 0;
        for c in &mut self.0 {
            total += c.count(env)?;
        }
        Ok(Number::from(total))
    }

    fn is_constant(&self) -> bool {
        self.0.iter().all(Collection::is_constant)
    }
}

/// `any(collection)`.
struct Any(Collection);

impl Generator<bool> for Any {
    fn value(&mut self, env: &Env) -> Result<bool> {
        self.0.any(env)
    }

    fn is_constant(&self) -> bool {
        self.0.is_constant()
    }
}

/// `exist(list)`: every path is there.  An empty list is `false`.
struct ExistAll {
    location: Var<String>,
    list: GenPtr<Vec<String>>,
}

impl Generator<bool> for ExistAll {
    fn value(&mut self, env: &Env) -> Result<bool> {
        let paths = self.list.value(env)?;
        if paths.is_empty() {
            return Ok(false);
        }
        let location = self.location.borrow().clone();
        for p in paths {
            if !f::path_exists(os::join(&location, &p), env)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// `countinside(def, dir)`: the definition enumerates `dir`.
struct CountInside {
    location: Var<String>,
    dir: GenPtr<String>,
    def: DefPtr,
}

impl Generator<Number> for CountInside {
    fn value(&mut self, env: &Env) -> Result<Number> {
        let dir = self.dir.value(env)?;
        *self.location.borrow_mut() = dir;
        Ok(Number::from(definition::count(self.def.as_mut(), env)?))
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

impl Parser {
    fn arg<T>(&mut self, c: &Call<'_>, i: usize, kind: Kind, parse: Parse<T>) -> Result<GenPtr<T>> {
        let tokens = c.args[i];
        match self.attempt(|p| parse(p, tokens))? {
            Some(g) => Ok(g),
            None => Err(f::arg_type_error(i + 1, kind.name(), c.name, tokens.line())),
        }
    }

    fn string_arg(&mut self, c: &Call<'_>, i: usize) -> Result<GenPtr<String>> {
        self.arg(c, i, Kind::String, Parser::parse_string)
    }

    fn number_arg(&mut self, c: &Call<'_>, i: usize) -> Result<GenPtr<Number>> {
        self.arg(c, i, Kind::Number, Parser::parse_number)
    }

    fn path_arg(&mut self, c: &Call<'_>, i: usize) -> Result<GenPtr<String>> {
        let path = self.string_arg(c, i)?;
        Ok(self.located(path))
    }

    fn collection(&mut self, t: Tokens<'_>) -> Result<Option<Collection>> {
        if let Some(d) = self.attempt(|p| p.parse_definition(t))? {
            return Ok(Some(Collection::Definition(d)));
        }
        if let Some(g) = self.attempt(|p| p.parse_list(t))? {
            return Ok(Some(Collection::List(g)));
        }
        if let Some(g) = self.attempt(|p| p.parse_numlist(t))? {
            return Ok(Some(Collection::NumList(g)));
        }
        Ok(self.attempt(|p| p.parse_timelist(t))?.map(Collection::TimeList))
    }

    /// The current path of the innermost loop over paths.
    fn this_path(&mut self, c: &Call<'_>) -> Result<GenPtr<String>> {
        let inside = self.ctx.file().is_some_and(|fc| fc.has_attributes());
        let this = if inside { self.ctx.typed("this", c.line, Variable::as_string)? } else { None };
        match this {
            Some(g) => Ok(self.located(g)),
            None => Err(Error::syntax(
                format!("function '{}' can be called only inside an iteration loop", c.name),
                c.line,
            )),
        }
    }

    pub(crate) fn bool_function(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<bool>>> {
        let Some(c) = call(t)? else {
            return Ok(None);
        };
        let string_test: Option<fn(String) -> Result<bool>> = match c.name {
            "islower" => Some(f::is_lower),
            "isupper" => Some(f::is_upper),
            "isnumber" => Some(f::is_number),
            "isletter" => Some(f::is_letter),
            "isdigit" => Some(f::is_digit),
            "isbinary" => Some(f::is_binary),
            "ishex" => Some(f::is_hex),
            _ => None,
        };
        if let Some(test) = string_test {
            c.expect(&[1])?;
            let s = self.string_arg(&c, 0)?;
            return Ok(Some(func1(s, test)));
        }
        let pair_test: Option<fn(String, String) -> Result<bool>> = match c.name {
            "contains" => Some(f::contains),
            "startswith" => Some(f::starts_with),
            "endswith" => Some(f::ends_with),
            _ => None,
        };
        if let Some(test) = pair_test {
            c.expect(&[2])?;
            let a = self.string_arg(&c, 0)?;
            let b = self.string_arg(&c, 1)?;
            return Ok(Some(func2(a, b, test)));
        }
        let path_test: Option<fn(String, &Env) -> Result<bool>> = match c.name {
            "exists" => Some(f::path_exists),
            "isfile" => Some(f::path_is_file),
            "isdirectory" => Some(f::path_is_directory),
            "hidden" => Some(f::path_hidden),
            "readonly" => Some(f::path_readonly),
            "empty" => Some(f::path_empty),
            _ => None,
        };
        if let Some(test) = path_test {
            c.expect(&[1])?;
            let path = self.path_arg(&c, 0)?;
            return Ok(Some(env_func(path, test)));
        }
        match c.name {
            "any" => {
                c.expect(&[1])?;
                match self.collection(c.args[0])? {
                    Some(col) => Ok(Some(Box::new(Any(col)))),
                    None => Err(f::arg_type_error(1, "collection", c.name, c.line)),
                }
            }
            "exist" => {
                c.expect(&[1])?;
                if let Some(d) = self.attempt(|p| p.parse_definition(c.args[0]))? {
                    return Ok(Some(Box::new(Any(Collection::Definition(d)))));
                }
                let list = self.arg(&c, 0, Kind::List, Parser::parse_list)?;
                Ok(Some(Box::new(ExistAll { location: self.ctx.location(), list })))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn number_function(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Number>>> {
        let Some(c) = call(t)? else {
            return Ok(None);
        };
        let of_number: Option<fn(Number) -> Result<Number>> = match c.name {
            "absolute" => Some(f::absolute),
            "ceil" => Some(f::ceil),
            "floor" => Some(f::floor),
            "round" => Some(f::round),
            "sign" => Some(f::sign),
            "sqrt" => Some(f::sqrt),
            "truncate" => Some(f::truncate),
            _ => None,
        };
        if let Some(func) = of_number {
            c.expect(&[1])?;
            let n = self.number_arg(&c, 0)?;
            return Ok(Some(func1(n, func)));
        }
        let of_string: Option<fn(String) -> Result<Number>> = match c.name {
            "length" => Some(f::length),
            "number" => Some(f::to_number),
            "frombinary" => Some(f::from_binary),
            "fromhex" => Some(f::from_hex),
            _ => None,
        };
        if let Some(func) = of_string {
            c.expect(&[1])?;
            let s = self.string_arg(&c, 0)?;
            return Ok(Some(func1(s, func)));
        }
        let aggregate: Option<fn(Vec<Number>) -> Result<Number>> = match c.name {
            "sum" => Some(f::sum),
            "average" => Some(f::average),
            "median" => Some(f::median),
            "min" => Some(f::min),
            "max" => Some(f::max),
            _ => None,
        };
        if let Some(func) = aggregate {
            return self.aggregate(&c, func).map(Some);
        }
        match c.name {
            "power" => {
                c.expect(&[2])?;
                let base = self.number_arg(&c, 0)?;
                let exp = self.number_arg(&c, 1)?;
                Ok(Some(func2(base, exp, f::power)))
            }
            "size" => {
                c.expect(&[1])?;
                let path = self.path_arg(&c, 0)?;
                Ok(Some(env_func(path, f::path_size)))
            }
            "count" => self.count(&c).map(Some),
            "countinside" => self.count_inside(&c).map(Some),
            "first" | "last" if c.args.len() == 1 => {
                let Some(list) = self.attempt(|p| p.parse_numlist(c.args[0]))? else {
                    return Ok(None);
                };
                let pick = if c.name == "first" { f::first_of::<Number> } else { f::last_of::<Number> };
                Ok(Some(func1(list, pick)))
            }
            _ => Ok(None),
        }
    }

    /// A number list, or any count of numbers.
    fn aggregate(&mut self, c: &Call<'_>, func: fn(Vec<Number>) -> Result<Number>) -> Result<GenPtr<Number>> {
        if c.args.is_empty() {
            return Err(f::arg_count_error(c.name, 0, c.line));
        }
        if c.args.len() == 1 {
            if let Some(list) = self.attempt(|p| p.parse_numlist(c.args[0]))? {
                return Ok(func1(list, func));
            }
        }
        let mut values = Vec::with_capacity(c.args.len());
        for i in 0..c.args.len() {
            values.push(self.number_arg(c, i)?);
        }
        Ok(func_n(values, func))
    }

    fn count(&mut self, c: &Call<'_>) -> Result<GenPtr<Number>> {
        if c.args.is_empty() {
            return Err(Error::syntax(format!("function '{}' needs at least one argument", c.name), c.line));
        }
        let mut parts = Vec::with_capacity(c.args.len());
        for (i, arg) in c.args.iter().enumerate() {
            match self.collection(*arg)? {
                Some(col) => parts.push(col),
                None => {
                    return Err(Error::syntax(
                        format!("{} argument of the function '{}' is not a collection", ordinal(i + 1), c.name),
                        arg.line(),
                    ))
                }
            }
        }
        Ok(Box::new(Count(parts)))
    }

    fn count_inside(&mut self, c: &Call<'_>) -> Result<GenPtr<Number>> {
        c.expect(&[1, 2])?;
        let location = var(String::new());
        let def_tokens = c.args[0];
        let def = self.with_location(location.clone(), |p| p.attempt(|p| p.parse_definition(def_tokens)))?;
        let Some(def) = def else {
            return Err(f::arg_type_error(1, Kind::Definition.name(), c.name, def_tokens.line()));
        };
        let dir = if c.args.len() == 2 { self.path_arg(c, 1)? } else { self.this_path(c)? };
        Ok(Box::new(CountInside { location, dir, def }))
    }

    pub(crate) fn time_function(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Time>>> {
        let Some(c) = call(t)? else {
            return Ok(None);
        };
        let of_year: Option<fn(Number) -> Result<Time>> = match c.name {
            "christmas" => Some(f::christmas),
            "easter" => Some(f::easter),
            "newyear" => Some(f::newyear),
            _ => None,
        };
        if let Some(func) = of_year {
            c.expect(&[1])?;
            let y = self.number_arg(&c, 0)?;
            return Ok(Some(func1(y, func)));
        }
        match c.name {
            "date" => {
                c.expect(&[3])?;
                let d = self.number_arg(&c, 0)?;
                let m = self.number_arg(&c, 1)?;
                let y = self.number_arg(&c, 2)?;
                Ok(Some(func3(d, m, y, f::date)))
            }
            "time" => {
                c.expect(&[2, 3, 5, 6])?;
                let mut values = Vec::with_capacity(c.args.len());
                for i in 0..c.args.len() {
                    values.push(self.number_arg(&c, i)?);
                }
                Ok(Some(func_n(values, f::time)))
            }
            "creation" | "modification" => {
                c.expect(&[1])?;
                let path = self.path_arg(&c, 0)?;
                let read = if c.name == "creation" { f::path_creation } else { f::path_modification };
                Ok(Some(env_func(path, read)))
            }
            "first" | "last" if c.args.len() == 1 => {
                let Some(list) = self.attempt(|p| p.parse_timelist(c.args[0]))? else {
                    return Ok(None);
                };
                let pick = if c.name == "first" { f::first_of::<Time> } else { f::last_of::<Time> };
                Ok(Some(func1(list, pick)))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn string_function(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<String>>> {
        let Some(c) = call(t)? else {
            return Ok(None);
        };
        let of_string: Option<fn(String) -> Result<String>> = match c.name {
            "lower" => Some(f::lower),
            "upper" => Some(f::upper),
            "capitalize" => Some(f::capitalize),
            "reverse" => Some(f::reverse),
            "trim" => Some(f::trim),
            "digits" => Some(f::digits),
            "letters" => Some(f::letters),
            "extension" => Some(f::path_extension),
            "name" => Some(f::path_name),
            "parent" => Some(f::path_parent),
            _ => None,
        };
        if let Some(func) = of_string {
            c.expect(&[1])?;
            let s = self.string_arg(&c, 0)?;
            return Ok(Some(func1(s, func)));
        }
        let of_number: Option<fn(Number) -> Result<String>> = match c.name {
            "roman" => Some(f::roman),
            "binary" => Some(f::binary),
            "hex" => Some(f::hex),
            "monthname" => Some(f::monthname),
            "weekdayname" => Some(f::weekdayname),
            _ => None,
        };
        if let Some(func) = of_number {
            c.expect(&[1])?;
            let n = self.number_arg(&c, 0)?;
            return Ok(Some(func1(n, func)));
        }
        let string_pair: Option<fn(String, String) -> Result<String>> = match c.name {
            "after" => Some(f::after),
            "before" => Some(f::before),
            _ => None,
        };
        if let Some(func) = string_pair {
            c.expect(&[2])?;
            let a = self.string_arg(&c, 0)?;
            let b = self.string_arg(&c, 1)?;
            return Ok(Some(func2(a, b, func)));
        }
        let string_number: Option<fn(String, Number) -> Result<String>> = match c.name {
            "left" => Some(f::left),
            "right" => Some(f::right),
            "repeat" => Some(f::repeat),
            _ => None,
        };
        if let Some(func) = string_number {
            c.expect(&[2])?;
            let s = self.string_arg(&c, 0)?;
            let n = self.number_arg(&c, 1)?;
            return Ok(Some(func2(s, n, func)));
        }
        match c.name {
            "substring" => {
                c.expect(&[2, 3])?;
                let s = self.string_arg(&c, 0)?;
                let start = self.number_arg(&c, 1)?;
                if c.args.len() == 2 {
                    return Ok(Some(func2(s, start, f::substring_from)));
                }
                let len = self.number_arg(&c, 2)?;
                Ok(Some(func3(s, start, len, f::substring)))
            }
            "fill" => {
                c.expect(&[2])?;
                let n = self.number_arg(&c, 0)?;
                let width = self.number_arg(&c, 1)?;
                Ok(Some(func2(n, width, f::fill)))
            }
            "replace" => {
                c.expect(&[3])?;
                let s = self.string_arg(&c, 0)?;
                let from = self.string_arg(&c, 1)?;
                let to = self.string_arg(&c, 2)?;
                Ok(Some(func3(s, from, to, f::replace)))
            }
            "concatenate" => {
                if c.args.is_empty() {
                    return Err(f::arg_count_error(c.name, 0, c.line));
                }
                let mut parts = Vec::with_capacity(c.args.len());
                for i in 0..c.args.len() {
                    parts.push(self.string_arg(&c, i)?);
                }
                Ok(Some(func_n(parts, f::concatenate)))
            }
            "join" => {
                c.expect(&[2])?;
                let list = self.arg(&c, 0, Kind::List, Parser::parse_list)?;
                let sep = self.string_arg(&c, 1)?;
                Ok(Some(func2(list, sep, f::join)))
            }
            "string" => {
                c.expect(&[1])?;
                let arg = c.args[0];
                if let Some(s) = self.attempt(|p| p.parse_string(arg))? {
                    return Ok(Some(s));
                }
                let list = self.arg(&c, 0, Kind::String, Parser::parse_list)?;
                Ok(Some(func1(list, |l: Vec<String>| Ok(l.join(", ")))))
            }
            "first" | "last" => {
                c.expect(&[1])?;
                let list = self.arg(&c, 0, Kind::List, Parser::parse_list)?;
                let pick = if c.name == "first" { f::first_of::<String> } else { f::last_of::<String> };
                Ok(Some(func1(list, pick)))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn list_function(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<String>>>> {
        let Some(c) = call(t)? else {
            return Ok(None);
        };
        match c.name {
            "characters" | "words" => {
                c.expect(&[1])?;
                let s = self.string_arg(&c, 0)?;
                let func = if c.name == "words" { f::words } else { f::characters };
                Ok(Some(func1(s, func)))
            }
            "split" => {
                c.expect(&[2])?;
                let s = self.string_arg(&c, 0)?;
                let sep = self.string_arg(&c, 1)?;
                Ok(Some(func2(s, sep, f::split)))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn numlist_function(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<Number>>>> {
        let Some(c) = call(t)? else {
            return Ok(None);
        };
        match c.name {
            "numbers" => {
                c.expect(&[1])?;
                let s = self.string_arg(&c, 0)?;
                Ok(Some(func1(s, f::numbers)))
            }
            _ => Ok(None),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use crate::os::MemFs;
    use crate::script::parse::tests::{error_of, eval, kind_of, parser, parser_with};
    use crate::script::time::Time;
    use crate::script::value::Kind;

    fn tree() -> MemFs {
        let stamp = Time::date(1, 1, 2024);
        let mut fs = MemFs::new();
        fs.add_file("/w/a.txt", 10, stamp);
        fs.add_file("/w/b.txt", 30, stamp);
        fs.add_file("/w/sub/c.txt", 5, stamp);
        fs.add_file("/w/sub/d.md", 7, stamp);
        fs
    }

    #[test]
    fn strings() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "lower('ABC')"), "abc");
        assert_eq!(eval(&mut p, "substring('abcdef', 2, 3)"), "cde");
        assert_eq!(eval(&mut p, "substring('abcdef', 4)"), "ef");
        assert_eq!(eval(&mut p, "concatenate('a', 1, 'b')"), "a1b");
        assert_eq!(eval(&mut p, "join(('x', 'y'), '-')"), "x-y");
        assert_eq!(eval(&mut p, "first(('x', 'y'))"), "x");
        assert_eq!(eval(&mut p, "string(2 + 2)"), "4");
        assert_eq!(eval(&mut p, "roman(1994)"), "MCMXCIV");
    }

    #[test]
    fn numbers_and_aggregates() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "power(2, 10)"), "1024");
        assert_eq!(eval(&mut p, "length('hello')"), "5");
        assert_eq!(eval(&mut p, "sum(1, 2, 3)"), "6");
        assert_eq!(eval(&mut p, "max((4, 9, 2))"), "9");
        assert_eq!(eval(&mut p, "average(1, 2)"), "1.5");
        assert_eq!(eval(&mut p, "first((7, 8))"), "7");
        assert_eq!(kind_of(&mut p, "first((7, 8))"), Kind::Number);
    }

    #[test]
    fn times() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "date(1, 2, 2020)"), "1 February 2020");
        assert_eq!(eval(&mut p, "time(6, 2021)"), "June 2021");
        assert_eq!(eval(&mut p, "easter(2024)"), "31 March 2024");
        assert_eq!(error_of(&mut p, "time(1, 2, 3, 4)"), "function 'time' cannot be called with 4 arguments");
    }

    #[test]
    fn lists() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "split('a,b', ',')"), "a, b");
        assert_eq!(eval(&mut p, "numbers('x1y22')"), "1, 22");
        assert_eq!(kind_of(&mut p, "numbers('x1y22')"), Kind::NumList);
    }

    #[test]
    fn paths_and_collections() {
        let mut p = parser_with(tree());
        assert_eq!(eval(&mut p, "exists('sub')"), "1");
        assert_eq!(eval(&mut p, "size('sub')"), "12");
        assert_eq!(eval(&mut p, "size('none')"), "0");
        assert_eq!(eval(&mut p, "count(files)"), "2");
        assert_eq!(eval(&mut p, "count(files, directories, (1, 2))"), "5");
        assert_eq!(eval(&mut p, "countinside(files, 'sub')"), "2");
        assert_eq!(eval(&mut p, "any(files where size > 100)"), "0");
        assert_eq!(eval(&mut p, "exist(('a.txt', 'b.txt'))"), "1");
        assert_eq!(eval(&mut p, "exist(('a.txt', 'zzz'))"), "0");
    }

    #[test]
    fn call_diagnostics() {
        let mut p = parser_with(tree());
        assert_eq!(error_of(&mut p, "lower('a', 'b')"), "function 'lower' cannot be called with 2 arguments");
        assert_eq!(
            error_of(&mut p, "lower(files)"),
            "first argument of function 'lower' cannot be resolved to a string"
        );
        assert_eq!(error_of(&mut p, "count()"), "function 'count' needs at least one argument");
        assert_eq!(error_of(&mut p, "count(files, 3)"), "second argument of the function 'count' is not a collection");
        assert_eq!(
            error_of(&mut p, "countinside(files)"),
            "function 'countinside' can be called only inside an iteration loop"
        );
        assert!(error_of(&mut p, "count(files where name in 'a.txt', 'b.txt')").starts_with(
            "the right side of the operator 'in' used inside a function 'count' should be embraced by brackets"
        ));
        assert!(error_of(&mut p, "string('a' like 'a', 'b')").starts_with(
            "the right side of the operator 'like' used inside a function 'string' should be embraced by brackets"
        ));
    }
}
