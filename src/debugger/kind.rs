use std::fmt;

/// Kind of PL object a frame or session refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlKind {
    /// Stored function
    Function,
    /// Stored procedure
    Procedure,
    /// Anonymous executable block
    AnonymousBlock,
    /// Package specification
    PackageHead,
    /// Package body
    PackageBody,
}

impl PlKind {
    /// Convert to the wire representation used by the debug service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
            Self::AnonymousBlock => "ANONYMOUS_BLOCK",
            Self::PackageHead => "PACKAGE_HEAD",
            Self::PackageBody => "PACKAGE_BODY",
        }
    }

    /// Parse the wire representation, accepting a few aliases the service emits
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "FUNCTION" => Some(Self::Function),
            "PROCEDURE" => Some(Self::Procedure),
            "ANONYMOUS_BLOCK" | "ANONYMOUS" => Some(Self::AnonymousBlock),
            "PACKAGE_HEAD" | "PACKAGE" => Some(Self::PackageHead),
            "PACKAGE_BODY" => Some(Self::PackageBody),
            _ => None,
        }
    }

    /// Packages are the only kinds that own subprograms
    pub fn is_package(&self) -> bool {
        matches!(self, Self::PackageHead | Self::PackageBody)
    }
}

impl fmt::Display for PlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name under which the anonymous block frame is cached
pub const ANONYMOUS_BLOCK_NAME: &str = "$anonymous_block";

/// Identity of a PL object: (package, name, kind)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlIdentity {
    /// Owning package, if the object lives in one
    pub package_name: Option<String>,
    /// Object name
    pub name: String,
    /// Object kind
    pub kind: PlKind,
}

impl PlIdentity {
    pub fn new(kind: PlKind, name: impl Into<String>, package_name: Option<String>) -> Self {
        Self {
            package_name,
            name: name.into(),
            kind,
        }
    }

    /// Identity of the anonymous block being debugged
    pub fn anonymous() -> Self {
        Self::new(PlKind::AnonymousBlock, ANONYMOUS_BLOCK_NAME, None)
    }

    /// Normalize a position reported by the debug service into the frame that
    /// holds its source.
    ///
    /// Subprograms of a package live in the package body, so every position
    /// inside a package maps to `(package, package, PackageBody)`. Anonymous
    /// blocks have no server-side name and map to [`PlIdentity::anonymous`].
    pub fn from_backtrace(kind: PlKind, name: &str, package_name: Option<&str>) -> Self {
        if kind == PlKind::AnonymousBlock {
            return Self::anonymous();
        }
        match package_name.filter(|p| !p.is_empty()) {
            Some(package) if kind != PlKind::PackageHead => {
                Self::new(PlKind::PackageBody, package, Some(package.to_string()))
            }
            Some(package) => Self::new(kind, package, Some(package.to_string())),
            None => Self::new(kind, name, None),
        }
    }
}

impl fmt::Display for PlIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package_name {
            Some(package) if package != &self.name => write!(f, "{}.{}", package, self.name),
            _ => f.write_str(&self.name),
        }
    }
}

/// Mode of a procedure or function parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    In,
    Out,
    InOut,
}

impl ParamMode {
    /// Whether the backend reports a value for this parameter after exit
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }
}

/// A declared parameter and the value supplied for it
#[derive(Debug, Clone, PartialEq)]
pub struct PlParam {
    pub name: String,
    pub data_type: String,
    pub mode: ParamMode,
    /// Input value; `None` binds NULL
    pub value: Option<String>,
}

impl PlParam {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, mode: ParamMode) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            mode,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// What a debug session is created for. Each variant carries the schema the
/// debug service needs to start executing it.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugTarget {
    Function {
        name: String,
        package_name: Option<String>,
        params: Vec<PlParam>,
        return_type: String,
    },
    Procedure {
        name: String,
        package_name: Option<String>,
        params: Vec<PlParam>,
    },
    AnonymousBlock {
        text: String,
    },
    PackageHead {
        package_name: String,
    },
    PackageBody {
        package_name: String,
    },
}

impl DebugTarget {
    pub fn kind(&self) -> PlKind {
        match self {
            Self::Function { .. } => PlKind::Function,
            Self::Procedure { .. } => PlKind::Procedure,
            Self::AnonymousBlock { .. } => PlKind::AnonymousBlock,
            Self::PackageHead { .. } => PlKind::PackageHead,
            Self::PackageBody { .. } => PlKind::PackageBody,
        }
    }

    pub fn package_name(&self) -> Option<&str> {
        match self {
            Self::Function { package_name, .. } | Self::Procedure { package_name, .. } => {
                package_name.as_deref()
            }
            Self::PackageHead { package_name } | Self::PackageBody { package_name } => {
                Some(package_name.as_str())
            }
            Self::AnonymousBlock { .. } => None,
        }
    }

    /// Name of the object the session is created for
    pub fn name(&self) -> &str {
        match self {
            Self::Function { name, .. } | Self::Procedure { name, .. } => name,
            Self::PackageHead { package_name } | Self::PackageBody { package_name } => package_name,
            Self::AnonymousBlock { .. } => ANONYMOUS_BLOCK_NAME,
        }
    }

    /// Identity of the main frame. A packaged subprogram is debugged from
    /// its package body, the same frame the backtrace resolves to.
    pub fn identity(&self) -> PlIdentity {
        PlIdentity::from_backtrace(self.kind(), self.name(), self.package_name())
    }

    /// Source text when it is carried inline rather than fetched
    pub fn inline_source(&self) -> Option<&str> {
        match self {
            Self::AnonymousBlock { text } => Some(text),
            _ => None,
        }
    }
}
