pub mod ast;
pub mod kinds;
pub mod lexer;
pub mod parser;
pub mod pretty;

pub use crate::commons::*;
pub use ast::*;
pub use lexer::{lex, Token, TokenKind};
pub use parser::{parse, ParseError};
