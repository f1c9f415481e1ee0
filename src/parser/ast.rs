//! The program tree produced by the parser.
use std::rc::Rc;

#[derive(Debug, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    pub fn new(items: Vec<Item>) -> Program {
        Program { items }
    }
}

#[derive(Debug, PartialEq)]
pub enum Item {
    /// `function NAME(p1, …) { body }`
    FunctionDef(String, Vec<String>, Rc<StmtList>),
    /// `[pattern] [{ action }]`; a missing action prints the record.
    PatternAction(Pattern, Option<Rc<StmtList>>),
}

#[derive(Debug, PartialEq)]
pub enum Pattern {
    Begin,
    End,
    /// No pattern: matches every record.
    Always,
    Expr(Rc<Expr>),
    /// Two-expression range item; activates on the first, deactivates on
    /// the second.
    Range(Rc<Expr>, Rc<Expr>),
}

#[derive(Debug, PartialEq)]
pub struct StmtList(pub Vec<Stmt>);

#[derive(Debug, PartialEq)]
pub enum Stmt {
    Block(StmtList),
    IfElse(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    DoWhile(Expr, Box<Stmt>),
    For(
        Option<Box<Stmt>>,
        Option<Expr>,
        Option<Box<Stmt>>,
        Box<Stmt>,
    ),
    ForIn(String, String, Box<Stmt>),
    Expr(Expr),
    Break,
    Continue,
    Next,
    NextFile,
    Exit(Option<Expr>),
    Return(Option<Expr>),
    Delete(String, ExprList),
    Print(ExprList, Option<OutputRedirection>),
    Printf(ExprList, Option<OutputRedirection>),
}

#[derive(Debug, PartialEq)]
pub enum OutputRedirection {
    Truncate(Expr),
    Append(Expr),
    Pipe(Expr),
}

#[derive(Debug, PartialEq)]
pub struct ExprList(pub Vec<Expr>);

impl ExprList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, PartialEq)]
pub enum Expr {
    Grouping(Box<Expr>),
    UnaryPlus(Box<Expr>),
    UnaryMinus(Box<Expr>),
    LogicalNot(Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Mod(Box<Expr>, Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Minus(Box<Expr>, Box<Expr>),
    Concat(Box<Expr>, Box<Expr>),
    Comparison(CmpOperator, Box<Expr>, Box<Expr>),
    /// `lhs ~ rhs` (or `!~` when negated).
    Match(bool, Box<Expr>, Box<Expr>),
    /// `key in arr` or `(k1, k2, …) in arr`.
    InArray(ExprList, String),
    LogicalAnd(Box<Expr>, Box<Expr>),
    LogicalOr(Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Number(f64),
    String(String),
    /// A regex literal; outside the match operators and the regex-taking
    /// builtins it tests itself against `$0`.
    Regexp(String),
    LValue(LValueType),
    PreIncrement(LValueType),
    PreDecrement(LValueType),
    PostIncrement(LValueType),
    PostDecrement(LValueType),
    FunctionCall(String, ExprList),
    BuiltinCall(Builtin, ExprList),
    Getline(Option<String>, GetlineSource),
    Assign(AssignType, LValueType, Box<Expr>),
}

#[derive(Debug, PartialEq)]
pub enum GetlineSource {
    /// The main input stream driven by ARGV.
    Main,
    /// `getline [var] < expr`
    File(Box<Expr>),
    /// `expr | getline [var]`
    Command(Box<Expr>),
}

#[derive(Debug, PartialEq)]
pub enum LValueType {
    Name(String),
    Dollar(Box<Expr>),
    Brackets(String, ExprList),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CmpOperator {
    LessThan,
    LessThanOrEqual,
    NotEqual,
    Equal,
    GreaterThan,
    GreaterThanOrEqual,
}

impl CmpOperator {
    pub fn compare<T: PartialOrd>(self, avalue: &T, bvalue: &T) -> bool {
        match self {
            CmpOperator::LessThan => avalue < bvalue,
            CmpOperator::LessThanOrEqual => avalue <= bvalue,
            CmpOperator::NotEqual => avalue != bvalue,
            CmpOperator::Equal => avalue == bvalue,
            CmpOperator::GreaterThan => avalue > bvalue,
            CmpOperator::GreaterThanOrEqual => avalue >= bvalue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignType {
    Normal,
    Pow,
    Mod,
    Mul,
    Div,
    Add,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Atan2,
    Close,
    Cos,
    Exp,
    Gsub,
    Index,
    Int,
    Length,
    Log,
    Match,
    Rand,
    Sin,
    Split,
    Sprintf,
    Sqrt,
    Srand,
    Sub,
    Substr,
    System,
    Tolower,
    Toupper,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "atan2" => Some(Builtin::Atan2),
            "close" => Some(Builtin::Close),
            "cos" => Some(Builtin::Cos),
            "exp" => Some(Builtin::Exp),
            "gsub" => Some(Builtin::Gsub),
            "index" => Some(Builtin::Index),
            "int" => Some(Builtin::Int),
            "length" => Some(Builtin::Length),
            "log" => Some(Builtin::Log),
            "match" => Some(Builtin::Match),
            "rand" => Some(Builtin::Rand),
            "sin" => Some(Builtin::Sin),
            "split" => Some(Builtin::Split),
            "sprintf" => Some(Builtin::Sprintf),
            "sqrt" => Some(Builtin::Sqrt),
            "srand" => Some(Builtin::Srand),
            "sub" => Some(Builtin::Sub),
            "substr" => Some(Builtin::Substr),
            "system" => Some(Builtin::System),
            "tolower" => Some(Builtin::Tolower),
            "toupper" => Some(Builtin::Toupper),
            _ => None,
        }
    }

    /// True when a regex literal handed to this builtin is a pattern
    /// argument rather than an implicit match against the record.
    pub fn takes_regex(self) -> bool {
        match self {
            Builtin::Gsub | Builtin::Match | Builtin::Split | Builtin::Sub => true,
            _ => false,
        }
    }
}
