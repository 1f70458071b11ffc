//! Statement and expression nodes

use serde::{Deserialize, Serialize};

/// A sequence of statements evaluated in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nodes {
    pub nodes: Vec<Node>,
}

impl Nodes {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }
}

impl From<Vec<Node>> for Nodes {
    fn from(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

impl<'a> IntoIterator for &'a Nodes {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// AST node
///
/// Names keep their sigils (`$global`, `@@class_var`, `@ivar`); the scope
/// chain decides which store a name lives in from its leading characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(f64),
    /// Text literal, interpolated on evaluation
    Str(String),
    /// Symbol literal (name without the leading colon)
    Symbol(String),
    True,
    False,
    Nil,
    /// `self`
    SelfRef,

    /// Local variable read; falls back to a zero-argument call on `self`
    GetLocal(String),
    SetLocal {
        name: String,
        value: Box<Node>,
    },
    GetConstant(String),
    /// Define-once constant binding
    SetConstant {
        name: String,
        value: Box<Node>,
    },
    GetGlobal(String),
    SetGlobal {
        name: String,
        value: Box<Node>,
    },
    GetClassVar(String),
    SetClassVar {
        name: String,
        value: Box<Node>,
    },
    GetInstanceVar(String),
    SetInstanceVar {
        name: String,
        value: Box<Node>,
    },

    /// Method call: `receiver.method(arguments)`; no receiver means `self`
    Call {
        receiver: Option<Box<Node>>,
        method: String,
        arguments: Vec<Node>,
    },
    /// `super` / `super(arguments)` inside a method body
    Super { arguments: Option<Vec<Node>> },

    /// Class definition or reopening
    Class {
        name: String,
        parent: Option<String>,
        body: Nodes,
    },
    /// Accessor pair generation: `property a b c`
    Property { names: Vec<String> },
    /// Method definition on the current class
    DefMethod {
        name: String,
        params: Vec<String>,
        body: Nodes,
    },
    /// Anonymous function capturing the defining frame
    Lambda { params: Vec<String>, body: Nodes },

    /// `if` / `elsif` / `else`; an `elsif` is an `If` in `else_branch`,
    /// a plain `else` is a `Block`
    If {
        condition: Box<Node>,
        body: Nodes,
        else_branch: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Nodes,
    },
    /// Nested statement sequence
    Block(Nodes),
    Return(Option<Box<Node>>),
    /// Abandon the rest of the enclosing block (loop `continue`)
    Next,

    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),

    /// Evaluate `body` in a fresh namespace registered as `name`
    Namespace { name: String, body: Nodes },
    /// Read `name` from a registered namespace
    NamespaceGet { namespace: String, name: String },
}

impl Node {
    pub fn int(n: i64) -> Self {
        Node::Integer(n)
    }

    pub fn str(text: impl Into<String>) -> Self {
        Node::Str(text.into())
    }

    pub fn local(name: impl Into<String>) -> Self {
        Node::GetLocal(name.into())
    }

    pub fn set_local(name: impl Into<String>, value: Node) -> Self {
        Node::SetLocal {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Node::GetConstant(name.into())
    }

    pub fn set_constant(name: impl Into<String>, value: Node) -> Self {
        Node::SetConstant {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn ivar(name: impl Into<String>) -> Self {
        Node::GetInstanceVar(name.into())
    }

    pub fn set_ivar(name: impl Into<String>, value: Node) -> Self {
        Node::SetInstanceVar {
            name: name.into(),
            value: Box::new(value),
        }
    }

    /// Call with an explicit receiver
    pub fn call(receiver: Node, method: impl Into<String>, arguments: Vec<Node>) -> Self {
        Node::Call {
            receiver: Some(Box::new(receiver)),
            method: method.into(),
            arguments,
        }
    }

    /// Call on the current `self`
    pub fn send(method: impl Into<String>, arguments: Vec<Node>) -> Self {
        Node::Call {
            receiver: None,
            method: method.into(),
            arguments,
        }
    }

    pub fn class(name: impl Into<String>, parent: Option<&str>, body: Vec<Node>) -> Self {
        Node::Class {
            name: name.into(),
            parent: parent.map(str::to_string),
            body: body.into(),
        }
    }

    pub fn def(name: impl Into<String>, params: &[&str], body: Vec<Node>) -> Self {
        Node::DefMethod {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body: body.into(),
        }
    }

    pub fn ret(value: Node) -> Self {
        Node::Return(Some(Box::new(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_from_vec() {
        let nodes: Nodes = vec![Node::int(1), Node::Nil].into();
        assert_eq!(nodes.len(), 2);
        assert!(!nodes.is_empty());
    }

    #[test]
    fn test_call_builders() {
        let explicit = Node::call(Node::int(1), "+", vec![Node::int(2)]);
        assert!(matches!(explicit, Node::Call { receiver: Some(_), ref method, .. } if method == "+"));

        let implicit = Node::send("foo", vec![]);
        assert!(matches!(implicit, Node::Call { receiver: None, .. }));
    }

    #[test]
    fn test_serde_shape() {
        let node = Node::set_local("x", Node::int(5));
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"SetLocal":{"name":"x","value":{"Integer":5}}}"#);
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_nodes_serialize_as_array() {
        let nodes = Nodes::new(vec![Node::True, Node::Next]);
        assert_eq!(serde_json::to_string(&nodes).unwrap(), r#"["True","Next"]"#);
    }
}
