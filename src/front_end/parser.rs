// recursive-descent parser for the matlab-like language.

use derive_more::Display;

use super::*;
use TokenKind::*;

// SECTION: interface

pub fn parse(code: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new(code)?;
    program_r(&mut parser)
}

// A parse error with explanatory message.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct ParseError(pub String);
impl std::error::Error for ParseError {}

// SECTION: parser functionality

#[derive(Clone, Debug)]
struct Parser<'a> {
    code: &'a str,      // the source code being parsed
    tokens: Vec<Token>, // the token stream
    pos: usize,         // the position in the token stream
    ast: Ast,           // the tree being built
    // whether functions are closed by `end`; otherwise a `function` keyword
    // ends the function being parsed.
    functions_have_end: bool,
    // one entry per enclosing bracket: true for [...] and {...} literals,
    // where whitespace separates elements, false for (...).
    brackets: Vec<bool>,
    // how many index argument lists we are in; `end` is a value there.
    index_depth: usize,
}

// utility functions for traversing the token stream and creating error
// messages.
impl<'a> Parser<'a> {
    // always use this to create new Parsers.
    fn new(code: &'a str) -> Result<Self, ParseError> {
        let tokens = lex(code);
        let parser = Parser {
            code,
            functions_have_end: balanced_ends(&tokens),
            tokens,
            pos: 0,
            ast: Ast::new(),
            brackets: vec![],
            index_depth: 0,
        };
        if let Some(pos) = parser.tokens.iter().position(|t| t.kind == Error) {
            return parser.error(pos, "invalid lexeme");
        }
        Ok(parser)
    }

    // if the next token has the given kind advances the iterator and returns true,
    // otherwise returns false.
    fn eat(&mut self, kind: TokenKind) -> bool {
        match self.peek() {
            Some(k) if k == kind => {
                self.next();
                true
            }
            _ => false,
        }
    }

    // returns an Ok or Err result depending on whether the next token has the given
    // kind, advancing the iterator on an Ok result.
    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            self.error_next(&format!("expected `{kind}`"))
        }
    }

    // advances the iterator and returns the next token in the stream, or None if
    // there are no more tokens.
    fn next(&mut self) -> Option<TokenKind> {
        if !self.end() {
            self.pos += 1;
            Some(self.tokens[self.pos - 1].kind)
        } else {
            None
        }
    }

    // returns the next token (if it exists) without advancing the iterator.
    fn peek(&self) -> Option<TokenKind> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| t.kind)
    }

    // returns whether the next token has the given kind, without advancing the
    // iterator.
    fn next_is(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    // returns whether the next token is one of the given kinds.
    fn next_is_one_of(&self, kinds: &[TokenKind]) -> bool {
        matches!(self.peek(), Some(k) if kinds.contains(&k))
    }

    // returns whether we're at the end of the token stream.
    fn end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // returns the lexeme of the token immediately prior to the current token.
    fn slice_prev(&self) -> &'a str {
        &self.code[self.tokens[self.pos - 1].span.clone()]
    }

    // whether there is whitespace between the next token and the one before it.
    fn space_before(&self) -> bool {
        self.pos > 0
            && !self.end()
            && self.tokens[self.pos - 1].span.end < self.tokens[self.pos].span.start
    }

    // whether there is whitespace between the next token and the one after it.
    fn space_after(&self) -> bool {
        match (self.tokens.get(self.pos), self.tokens.get(self.pos + 1)) {
            (Some(t), Some(u)) => t.span.end < u.span.start,
            _ => true,
        }
    }

    // whether whitespace separates elements at the current position.
    fn in_literal(&self) -> bool {
        self.brackets.last() == Some(&true)
    }

    // the source position of the next token.
    fn span_next(&self) -> Span {
        let offset = match self.tokens.get(self.pos) {
            Some(t) => t.span.start,
            None => self.code.len(),
        };
        Span::of_offset(self.code, offset)
    }

    // returns a parse error knowing that the previous token that we just advanced
    // past caused an error.
    fn error_prev<T>(&self, msg: &str) -> Result<T, ParseError> {
        self.error(self.pos - 1, msg)
    }

    // returns a parse error knowing that the next token to be inspected causes an
    // error (based on a call to peek(), next_is(), etc).
    fn error_next<T>(&self, msg: &str) -> Result<T, ParseError> {
        // handle the case where we're at the end of the token stream.
        if self.pos >= self.tokens.len() {
            Err(ParseError(format!(
                "parse error: unexpected end of input ({msg})\n"
            )))
        } else {
            self.error(self.pos, msg)
        }
    }

    // constructs a parse error given the position of the error-causing token in the
    // token stream.
    fn error<T>(&self, pos: usize, msg: &str) -> Result<T, ParseError> {
        let span = &self.tokens[pos].span;
        let Span { line, column } = Span::of_offset(self.code, span.start);

        // the line containing the error-causing lexeme.
        let text = self.code.lines().nth(line as usize - 1).unwrap_or("");

        Err(ParseError(format!(
            "parse error in line {line}, column {column}\n{text}\n{:width$}^\n{msg}\n",
            "",
            width = column as usize - 1
        )))
    }

    fn add_expr(&mut self, expr: Expr) -> ExprId {
        self.ast.add_expr(expr)
    }
}

// whether the `end` keywords outside of brackets close every block opener,
// including functions.
fn balanced_ends(tokens: &[Token]) -> bool {
    let mut depth = 0i32;
    let mut openers = 0;
    let mut ends = 0;
    for t in tokens {
        match t.kind {
            OpenParen | OpenBracket | OpenBrace => depth += 1,
            CloseParen | CloseBracket | CloseBrace => depth -= 1,
            If | For | While | Switch | Fn if depth == 0 => openers += 1,
            End if depth == 0 => ends += 1,
            _ => {}
        }
    }
    openers == ends
}

// SECTION: parsing functions

// a whole file: statements of the script, interleaved with functions.
fn program_r(parser: &mut Parser) -> Result<Program, ParseError> {
    let mut script = vec![];
    let mut functions = vec![];

    loop {
        skip_separators(parser);
        match parser.peek() {
            None => break,
            Some(Fn) => functions.push(function_r(parser)?),
            Some(_) => script.push(stmt_r(parser)?),
        }
    }

    let script = if script.is_empty() {
        None
    } else {
        Some(parser.ast.add_block(script))
    };

    Ok(Program {
        ast: std::mem::take(&mut parser.ast),
        script,
        functions,
    })
}

fn skip_separators(parser: &mut Parser) {
    while parser.next_is_one_of(&[Newline, Semicolon, Comma]) {
        parser.next();
    }
}

// function definition, including its nested functions.
fn function_r(parser: &mut Parser) -> Result<FuncId, ParseError> {
    let span = parser.span_next();
    parser.expect(Fn)?;

    let mut outputs = vec![];
    let name;
    if parser.eat(OpenBracket) {
        // function [a, b] = name(...)
        while !parser.eat(CloseBracket) {
            parser.expect(Id)?;
            outputs.push(parser.slice_prev().to_string());
            parser.eat(Comma);
        }
        parser.expect(Gets)?;
        parser.expect(Id)?;
        name = parser.slice_prev().to_string();
    } else {
        parser.expect(Id)?;
        let first = parser.slice_prev().to_string();
        if parser.eat(Gets) {
            // function a = name(...)
            outputs.push(first);
            parser.expect(Id)?;
            name = parser.slice_prev().to_string();
        } else {
            name = first;
        }
    }

    let mut inputs = vec![];
    if parser.eat(OpenParen) {
        while !parser.eat(CloseParen) {
            match parser.next() {
                Some(Id) => inputs.push(parser.slice_prev().to_string()),
                Some(Tilde) => inputs.push("~".to_string()),
                x => return parser.error_prev(&format!("expected parameter name, got {x:?}")),
            }
            if !parser.next_is(CloseParen) {
                parser.expect(Comma)?;
            }
        }
    }

    let mut stmts = vec![];
    let mut nested = vec![];
    loop {
        skip_separators(parser);
        match parser.peek() {
            None => break,
            Some(End) if parser.functions_have_end => {
                parser.next();
                break;
            }
            Some(Fn) if parser.functions_have_end => nested.push(function_r(parser)?),
            // without `end`s, the next function starts where this one stops.
            Some(Fn) => break,
            Some(_) => stmts.push(stmt_r(parser)?),
        }
    }

    let body = parser.ast.add_block(stmts);
    Ok(parser.ast.add_function(ast::Function {
        name,
        inputs,
        outputs,
        body,
        nested,
        span,
    }))
}

// statements up to (not including) one of the given keywords.
fn block_r(parser: &mut Parser, terminators: &[TokenKind]) -> Result<BlockId, ParseError> {
    let mut stmts = vec![];
    loop {
        skip_separators(parser);
        if parser.end() {
            return parser.error_next(&format!("expected one of {terminators:?}"));
        }
        if parser.next_is_one_of(terminators) {
            break;
        }
        stmts.push(stmt_r(parser)?);
    }
    Ok(parser.ast.add_block(stmts))
}

// statement.
fn stmt_r(parser: &mut Parser) -> Result<StmtId, ParseError> {
    let span = parser.span_next();
    let kind = match parser.peek() {
        Some(If) => if_r(parser)?,
        Some(Switch) => switch_r(parser)?,
        Some(For) => for_r(parser)?,
        Some(While) => while_r(parser)?,
        Some(Break) => {
            parser.next();
            Stmt::Break
        }
        Some(Continue) => {
            parser.next();
            Stmt::Continue
        }
        Some(Return) => {
            parser.next();
            Stmt::Return
        }
        Some(Global) => {
            parser.next();
            Stmt::Global(names_r(parser)?)
        }
        Some(Persistent) => {
            parser.next();
            Stmt::Persistent(names_r(parser)?)
        }
        Some(_) => expr_or_assign_r(parser)?,
        None => return parser.error_next("expected a statement"),
    };
    Ok(parser.ast.add_stmt(kind, span))
}

// the names of a global/persistent declaration.
fn names_r(parser: &mut Parser) -> Result<Vec<String>, ParseError> {
    let mut names = vec![];
    while parser.eat(Id) {
        names.push(parser.slice_prev().to_string());
    }
    if names.is_empty() {
        return parser.error_next("expected a variable name");
    }
    Ok(names)
}

// expression statement or assignment, including the terminator that decides
// whether the result is displayed.
fn expr_or_assign_r(parser: &mut Parser) -> Result<Stmt, ParseError> {
    let lhs = expr_r(parser)?;
    let stmt = if parser.eat(Gets) {
        let rhs = expr_r(parser)?;
        Stmt::Assign {
            lhs,
            rhs,
            quiet: terminator_r(parser)?,
        }
    } else {
        Stmt::Expr {
            expr: lhs,
            quiet: terminator_r(parser)?,
        }
    };
    Ok(stmt)
}

// returns whether the statement is quiet (ends in `;`).
fn terminator_r(parser: &mut Parser) -> Result<bool, ParseError> {
    match parser.peek() {
        Some(Semicolon) => {
            parser.next();
            Ok(true)
        }
        Some(Comma) | Some(Newline) => {
            parser.next();
            Ok(false)
        }
        None | Some(End) | Some(Else) | Some(Elseif) | Some(Case) | Some(Otherwise) => Ok(false),
        x => parser.error_next(&format!("expected end of statement, got {x:?}")),
    }
}

// conditional statement.
fn if_r(parser: &mut Parser) -> Result<Stmt, ParseError> {
    parser.expect(If)?;
    let mut clauses = vec![];
    let cond = expr_r(parser)?;
    let body = block_r(parser, &[Elseif, Else, End])?;
    clauses.push(IfClause { cond, body });

    while parser.eat(Elseif) {
        let cond = expr_r(parser)?;
        let body = block_r(parser, &[Elseif, Else, End])?;
        clauses.push(IfClause { cond, body });
    }

    let else_body = if parser.eat(Else) {
        Some(block_r(parser, &[End])?)
    } else {
        None
    };
    parser.expect(End)?;

    Ok(Stmt::If { clauses, else_body })
}

fn switch_r(parser: &mut Parser) -> Result<Stmt, ParseError> {
    parser.expect(Switch)?;
    let subject = expr_r(parser)?;
    skip_separators(parser);

    let mut cases = vec![];
    while parser.eat(Case) {
        let label = expr_r(parser)?;
        let body = block_r(parser, &[Case, Otherwise, End])?;
        cases.push(SwitchCase { label, body });
    }

    let otherwise = if parser.eat(Otherwise) {
        Some(block_r(parser, &[End])?)
    } else {
        None
    };
    parser.expect(End)?;

    Ok(Stmt::Switch {
        subject,
        cases,
        otherwise,
    })
}

fn for_r(parser: &mut Parser) -> Result<Stmt, ParseError> {
    parser.expect(For)?;
    parser.expect(Id)?;
    let var = parser.slice_prev().to_string();
    parser.expect(Gets)?;
    let range = expr_r(parser)?;
    let body = block_r(parser, &[End])?;
    parser.expect(End)?;

    Ok(Stmt::For { var, range, body })
}

fn while_r(parser: &mut Parser) -> Result<Stmt, ParseError> {
    parser.expect(While)?;
    let cond = expr_r(parser)?;
    let body = block_r(parser, &[End])?;
    parser.expect(End)?;

    Ok(Stmt::While { cond, body })
}

// SECTION: expressions

// the function names follow the precedence levels, lowest first.

fn expr_r(parser: &mut Parser) -> Result<ExprId, ParseError> {
    binary_r(parser, 0)
}

// binary operators by precedence level, from `||` (0) to `&` (3).
const LOGICAL_LEVELS: [&[(TokenKind, BinaryOp)]; 4] = [
    &[(OrOr, BinaryOp::ShortOr)],
    &[(AndAnd, BinaryOp::ShortAnd)],
    &[(Pipe, BinaryOp::ElOr)],
    &[(Amp, BinaryOp::ElAnd)],
];

// left-associative binary operators of the logical levels; the level after
// the last one is comparison.
fn binary_r(parser: &mut Parser, level: usize) -> Result<ExprId, ParseError> {
    if level == LOGICAL_LEVELS.len() {
        return comparison_r(parser);
    }
    let mut lhs = binary_r(parser, level + 1)?;
    while let Some(op) = binop(parser, LOGICAL_LEVELS[level]) {
        let rhs = binary_r(parser, level + 1)?;
        lhs = parser.add_expr(Expr::Binary(lhs, op, rhs));
    }
    Ok(lhs)
}

fn comparison_r(parser: &mut Parser) -> Result<ExprId, ParseError> {
    let ops = [
        (Equal, BinaryOp::Eq),
        (NotEq, BinaryOp::NotEq),
        (Lt, BinaryOp::Lt),
        (Lte, BinaryOp::Lte),
        (Gt, BinaryOp::Gt),
        (Gte, BinaryOp::Gte),
    ];
    let mut lhs = range_r(parser)?;
    while let Some(op) = binop(parser, &ops) {
        let rhs = range_r(parser)?;
        lhs = parser.add_expr(Expr::Binary(lhs, op, rhs));
    }
    Ok(lhs)
}

// start:stop or start:step:stop.
fn range_r(parser: &mut Parser) -> Result<ExprId, ParseError> {
    let start = additive_r(parser)?;
    if !parser.eat(Colon) {
        return Ok(start);
    }
    let second = additive_r(parser)?;
    let expr = if parser.eat(Colon) {
        let stop = additive_r(parser)?;
        Expr::Range {
            start,
            step: Some(second),
            stop,
        }
    } else {
        Expr::Range {
            start,
            step: None,
            stop: second,
        }
    };
    Ok(parser.add_expr(expr))
}

fn additive_r(parser: &mut Parser) -> Result<ExprId, ParseError> {
    let mut lhs = multiplicative_r(parser)?;
    loop {
        let op = match parser.peek() {
            Some(Plus) => BinaryOp::Add,
            Some(Dash) => BinaryOp::Sub,
            _ => break,
        };
        // in [a -1], the minus starts a new element.
        if parser.in_literal() && parser.space_before() && !parser.space_after() {
            break;
        }
        parser.next();
        let rhs = multiplicative_r(parser)?;
        lhs = parser.add_expr(Expr::Binary(lhs, op, rhs));
    }
    Ok(lhs)
}

fn multiplicative_r(parser: &mut Parser) -> Result<ExprId, ParseError> {
    let ops = [
        (Star, BinaryOp::MatMul),
        (Slash, BinaryOp::MatDiv),
        (Backslash, BinaryOp::MatLeftDiv),
        (DotStar, BinaryOp::ElMul),
        (DotSlash, BinaryOp::ElDiv),
        (DotBackslash, BinaryOp::ElLeftDiv),
    ];
    let mut lhs = unary_r(parser)?;
    while let Some(op) = binop(parser, &ops) {
        let rhs = unary_r(parser)?;
        lhs = parser.add_expr(Expr::Binary(lhs, op, rhs));
    }
    Ok(lhs)
}

fn unary_r(parser: &mut Parser) -> Result<ExprId, ParseError> {
    let op = match parser.peek() {
        Some(Dash) => UnaryOp::Neg,
        Some(Plus) => UnaryOp::Plus,
        Some(Tilde) => UnaryOp::Not,
        _ => return power_r(parser),
    };
    parser.next();
    let operand = unary_r(parser)?;
    Ok(parser.add_expr(Expr::Unary(op, operand)))
}

fn power_r(parser: &mut Parser) -> Result<ExprId, ParseError> {
    let ops = [(Caret, BinaryOp::MatPow), (DotCaret, BinaryOp::ElPow)];
    let mut lhs = postfix_r(parser)?;
    while let Some(op) = binop(parser, &ops) {
        // 2^-1 is allowed.
        let rhs = match parser.peek() {
            Some(Dash) | Some(Plus) | Some(Tilde) => unary_r(parser)?,
            _ => postfix_r(parser)?,
        };
        lhs = parser.add_expr(Expr::Binary(lhs, op, rhs));
    }
    Ok(lhs)
}

// matches the next token against the given operator table.
fn binop(parser: &mut Parser, ops: &[(TokenKind, BinaryOp)]) -> Option<BinaryOp> {
    let next = parser.peek()?;
    let (_, op) = ops.iter().find(|(k, _)| *k == next)?;
    parser.next();
    Some(*op)
}

// indexing, calls, field accesses and transposes.
fn postfix_r(parser: &mut Parser) -> Result<ExprId, ParseError> {
    let mut expr = primary_r(parser)?;
    loop {
        match parser.peek() {
            // in [a (1)], the parenthesis starts a new element.
            Some(OpenParen) | Some(OpenBrace) if parser.in_literal() && parser.space_before() => {
                break
            }
            Some(OpenParen) => {
                parser.next();
                let args = args_r(parser, CloseParen)?;
                expr = parser.add_expr(Expr::Param { head: expr, args });
            }
            Some(OpenBrace) => {
                parser.next();
                let args = args_r(parser, CloseBrace)?;
                expr = parser.add_expr(Expr::CellIndex { head: expr, args });
            }
            Some(Dot) => {
                parser.next();
                parser.expect(Id)?;
                let field = parser.slice_prev().to_string();
                expr = parser.add_expr(Expr::Field { base: expr, field });
            }
            Some(Quote) => {
                parser.next();
                expr = parser.add_expr(Expr::Postfix(PostfixOp::CTranspose, expr));
            }
            Some(DotQuote) => {
                parser.next();
                expr = parser.add_expr(Expr::Postfix(PostfixOp::Transpose, expr));
            }
            _ => break,
        }
    }
    Ok(expr)
}

// index or call arguments, consuming the closing token.
fn args_r(parser: &mut Parser, close: TokenKind) -> Result<Vec<ExprId>, ParseError> {
    parser.brackets.push(false);
    parser.index_depth += 1;

    let mut args = vec![];
    while !parser.eat(close) {
        // a lone colon selects everything.
        let arg = if parser.next_is(Colon)
            && matches!(parser.peek_at(1), Some(Comma) | Some(CloseParen) | Some(CloseBrace))
        {
            parser.next();
            parser.add_expr(Expr::Colon)
        } else {
            expr_r(parser)?
        };
        args.push(arg);
        if !parser.next_is(close) {
            parser.expect(Comma)?;
        }
    }

    parser.index_depth -= 1;
    parser.brackets.pop();
    Ok(args)
}

fn primary_r(parser: &mut Parser) -> Result<ExprId, ParseError> {
    let expr = match parser.next() {
        Some(Num) => Expr::Num(parser.slice_prev().to_string()),
        Some(Str) => {
            let lexeme = parser.slice_prev();
            Expr::Str {
                text: lexeme[1..lexeme.len() - 1].replace("''", "'"),
                double: false,
            }
        }
        Some(DqStr) => {
            let lexeme = parser.slice_prev();
            Expr::Str {
                text: lexeme[1..lexeme.len() - 1].replace("\"\"", "\""),
                double: true,
            }
        }
        Some(Id) => Expr::Name(parser.slice_prev().to_string()),
        Some(End) if parser.index_depth > 0 => Expr::End,
        Some(OpenParen) => {
            parser.brackets.push(false);
            let inner = expr_r(parser)?;
            parser.brackets.pop();
            parser.expect(CloseParen)?;
            return Ok(inner);
        }
        Some(OpenBracket) => Expr::Matrix(rows_r(parser, CloseBracket)?),
        Some(OpenBrace) => Expr::Cell(rows_r(parser, CloseBrace)?),
        x => return parser.error_prev(&format!("expected an expression, got {x:?}")),
    };
    Ok(parser.add_expr(expr))
}

// the rows of a matrix or cell literal, consuming the closing token.
fn rows_r(parser: &mut Parser, close: TokenKind) -> Result<Vec<Vec<ExprId>>, ParseError> {
    parser.brackets.push(true);

    let mut rows = vec![];
    let mut row = vec![];
    loop {
        match parser.peek() {
            Some(k) if k == close => {
                parser.next();
                break;
            }
            Some(Semicolon) | Some(Newline) => {
                parser.next();
                if !row.is_empty() {
                    rows.push(std::mem::take(&mut row));
                }
            }
            Some(Comma) => {
                parser.next();
            }
            Some(_) => row.push(expr_r(parser)?),
            None => return parser.error_next(&format!("expected `{close}`")),
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }

    parser.brackets.pop();
    Ok(rows)
}
