use syn::meta::ParseNestedMeta;
use syn::{Attribute, Error, Expr, ExprArray, ExprLit, ExprPath, Lit, LitBool, LitStr, Token};

pub enum DefaultDefinition {
    Default,
    Expr(ExprPath),
}

pub struct FieldAttributes {
    pub default: Option<DefaultDefinition>,
    pub name: Option<LitStr>,
}

impl TryFrom<&Attribute> for FieldAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut default = None;
        let mut name = None;
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                if meta.input.peek(Token![=]) {
                    let value = meta.value()?;
                    let expr: LitStr = value.parse()?;
                    default = Some(DefaultDefinition::Expr(expr.parse()?));
                } else {
                    default = Some(DefaultDefinition::Default);
                }
            } else if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("Unrecognized field attribute!"));
            }

            Ok(())
        })?;

        Ok(Self { default, name })
    }
}

#[derive(Default)]
pub struct ComponentAttributes {
    pub id: Option<LitStr>,
    pub name: Option<LitStr>,
    pub description: Option<LitStr>,
    pub authors: Vec<LitStr>,
    pub enabled: Option<LitBool>,
    pub scope: Option<LitStr>,
    pub provides: Vec<LitStr>,
    pub is_primary: bool,
    pub requires: Vec<LitStr>,
    pub condition: Option<LitStr>,
    pub priority: Option<Expr>,
    pub is_disposable: bool,
}

impl TryFrom<&Attribute> for ComponentAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut attributes = Self::default();
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                attributes.id = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("name") {
                attributes.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("description") {
                attributes.description = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("authors") {
                attributes.authors = parse_string_array(&meta)?;
            } else if meta.path.is_ident("enabled") {
                attributes.enabled = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("scope") {
                attributes.scope = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("provides") {
                attributes.provides = parse_string_array(&meta)?;
            } else if meta.path.is_ident("primary") {
                attributes.is_primary = true;
            } else if meta.path.is_ident("requires") {
                attributes.requires = parse_string_array(&meta)?;
            } else if meta.path.is_ident("condition") {
                attributes.condition = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("priority") {
                attributes.priority = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("disposable") {
                attributes.is_disposable = true;
            } else {
                return Err(meta.error("Unrecognized component attribute!"));
            }

            Ok(())
        })?;

        Ok(attributes)
    }
}

fn parse_string_array(meta: &ParseNestedMeta) -> Result<Vec<LitStr>, Error> {
    let array: ExprArray = meta.value()?.parse()?;
    array
        .elems
        .into_iter()
        .map(|elem| match elem {
            Expr::Lit(ExprLit {
                lit: Lit::Str(string),
                ..
            }) => Ok(string),
            other => Err(Error::new_spanned(other, "Expected a string literal!")),
        })
        .collect()
}
