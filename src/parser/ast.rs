/// Source span of a node, as byte offsets into the script.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Meta {
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramData {
    pub meta: Meta,
    pub body: Vec<StatementType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatementData {
    pub meta: Meta,
    pub body: Vec<StatementType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementType {
    ExpressionStatement(ExpressionType),
    /// `name = value`
    AssignVariable {
        name: String,
        value: ExpressionType,
    },
    /// `object.name = value`
    AssignAttribute {
        object: ExpressionType,
        name: String,
        value: ExpressionType,
    },
    IfStatement {
        test: ExpressionType,
        consequent: BlockStatementData,
        alternate: Option<Box<AlternateType>>,
    },
    WhileStatement {
        test: ExpressionType,
        body: BlockStatementData,
    },
    ForInStatement {
        variable: String,
        iterable: ExpressionType,
        body: BlockStatementData,
    },
    ReturnStatement(Option<ExpressionType>),
}

/// What follows `else`: either a chained `if` or a plain block.
#[derive(Debug, Clone, PartialEq)]
pub enum AlternateType {
    ElseIf(StatementType),
    Else(BlockStatementData),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionType {
    Literal(LiteralType),
    Identifier(String),
    ListExpression {
        elements: Vec<ExpressionType>,
        frozen: bool,
    },
    MapExpression {
        entries: Vec<(ExpressionType, ExpressionType)>,
        frozen: bool,
    },
    FunctionExpression {
        params: Vec<String>,
        body: BlockStatementData,
    },
    UnaryExpression {
        operator: UnaryOperator,
        argument: Box<ExpressionType>,
    },
    BinaryExpression {
        operator: BinaryOperator,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
    LogicalExpression {
        operator: LogicalOperator,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
    /// `item in container`
    ContainsExpression {
        item: Box<ExpressionType>,
        container: Box<ExpressionType>,
    },
    CallExpression {
        callee: Box<ExpressionType>,
        arguments: Vec<ExpressionType>,
    },
    MemberExpression {
        object: Box<ExpressionType>,
        property: String,
    },
    ElementExpression {
        object: Box<ExpressionType>,
        index: Box<ExpressionType>,
    },
}

impl ExpressionType {
    /// Whether evaluating this expression may call into script or host code.
    pub fn contains_call(&self) -> bool {
        match self {
            ExpressionType::Literal(_)
            | ExpressionType::Identifier(_)
            | ExpressionType::FunctionExpression { .. } => false,
            ExpressionType::CallExpression { .. } => true,
            ExpressionType::ListExpression { elements, .. } => {
                elements.iter().any(|e| e.contains_call())
            }
            ExpressionType::MapExpression { entries, .. } => entries
                .iter()
                .any(|(k, v)| k.contains_call() || v.contains_call()),
            ExpressionType::UnaryExpression { argument, .. } => argument.contains_call(),
            ExpressionType::BinaryExpression { left, right, .. }
            | ExpressionType::LogicalExpression { left, right, .. } => {
                left.contains_call() || right.contains_call()
            }
            ExpressionType::ContainsExpression { item, container } => {
                item.contains_call() || container.contains_call()
            }
            ExpressionType::MemberExpression { object, .. } => object.contains_call(),
            ExpressionType::ElementExpression { object, index } => {
                object.contains_call() || index.contains_call()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    IntegerLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalOperator {
    And,
    Or,
}
