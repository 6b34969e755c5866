//! Fixed base classes shared by every generated SDK.
//!
//! Only the namespace varies between runs.

use super::GenerationContext;
use super::types::{
    ClassDecl, ClassKind, PhpExpr, PhpFile, PhpMethod, PhpParam, PhpProperty, PhpStmt, PhpType,
    UseDecl, Visibility,
};
use crate::config::Config;

const FROM_ARRAY: &str = r"$arguments = [];
foreach ($data as $key => $value) {
    if (!isset(static::$fieldMap[$key])) {
        continue;
    }
    $name = static::$fieldMap[$key];
    if ($value !== null && isset(static::$casts[$name])) {
        $class = static::$casts[$name];
        $value = $class::fromArray($value);
    } elseif ($value !== null && isset(static::$listCasts[$name])) {
        $class = static::$listCasts[$name];
        $value = array_map(fn (array $item) => $class::fromArray($item), $value);
    }
    $arguments[$name] = $value;
}

return new static(...$arguments);";

const TO_ARRAY: &str = r"$data = [];
foreach (static::$fieldMap as $key => $name) {
    $value = $this->{$name};
    if ($value instanceof self) {
        $value = $value->toArray();
    } elseif (is_array($value)) {
        $value = array_map(fn ($item) => $item instanceof self ? $item->toArray() : $item, $value);
    }
    $data[$key] = $value;
}

return $data;";

pub(crate) struct SupportFiles {
    pub resource_base: PhpFile,
    pub others: Vec<PhpFile>,
}

pub(crate) fn resource_base_fqcn(config: &Config) -> String {
    format!("{}\\Resource", config.namespace())
}

pub(crate) fn dto_base_fqcn(config: &Config) -> String {
    format!("{}\\Dto", config.namespace())
}

fn contract_fqcn(config: &Config) -> String {
    format!("{}\\Contracts\\Deserializable", config.namespace())
}

fn field_map_fqcn(config: &Config) -> String {
    format!("{}\\Concerns\\HasFieldMap", config.namespace())
}

/// Every class these templates declare.
pub(crate) fn fixed_fqcns(config: &Config) -> [String; 4] {
    [
        resource_base_fqcn(config),
        dto_base_fqcn(config),
        contract_fqcn(config),
        field_map_fqcn(config),
    ]
}

pub(crate) fn generate(ctx: &GenerationContext<'_>) -> SupportFiles {
    let config = ctx.config;
    SupportFiles {
        resource_base: resource_base(config),
        others: vec![dto_base(config), deserializable(config), has_field_map(config)],
    }
}

fn resource_base(config: &Config) -> PhpFile {
    let mut class = ClassDecl::new(ClassKind::Class, "Resource");
    class.methods.push(PhpMethod::new("__construct").params(vec![
        PhpParam::new("connector", PhpType::named("Connector")).promoted(Visibility::Protected),
    ]));

    let mut file = PhpFile::new(config.namespace(), class);
    file.add_use(UseDecl::new("Saloon\\Http\\Connector"));
    file
}

fn deserializable(config: &Config) -> PhpFile {
    let mut class = ClassDecl::new(ClassKind::Interface, "Deserializable");
    let mut from_array = PhpMethod::new("fromArray")
        .params(vec![PhpParam::new("data", PhpType::array())])
        .returns(PhpType::named("static"));
    from_array.is_static = true;
    class.methods.push(from_array);

    PhpFile::new(format!("{}\\Contracts", config.namespace()), class)
}

fn has_field_map(config: &Config) -> PhpFile {
    let mut class = ClassDecl::new(ClassKind::Trait, "HasFieldMap");
    class.doc = Some("Builds a Dto from wire data using its field map and casts.".to_string());
    let mut from_array = PhpMethod::new("fromArray")
        .params(vec![PhpParam::new("data", PhpType::array())])
        .returns(PhpType::named("static"))
        .body(vec![PhpStmt::Raw(FROM_ARRAY.to_string())]);
    from_array.is_static = true;
    class.methods.push(from_array);

    PhpFile::new(format!("{}\\Concerns", config.namespace()), class)
}

fn dto_base(config: &Config) -> PhpFile {
    let mut class = ClassDecl::new(ClassKind::AbstractClass, "Dto");
    class.implements.push("Deserializable".to_string());
    class.traits.push("HasFieldMap".to_string());

    // wire name => property, property => Dto class, property => item Dto class
    let static_array = |name: &str| PhpProperty {
        visibility: Visibility::Protected,
        is_static: true,
        name: name.to_string(),
        ty: Some(PhpType::array()),
        default: Some(PhpExpr::Array(Vec::new())),
    };
    class.properties = vec![
        static_array("fieldMap"),
        static_array("casts"),
        static_array("listCasts"),
    ];
    class.methods.push(
        PhpMethod::new("toArray")
            .returns(PhpType::array())
            .body(vec![PhpStmt::Raw(TO_ARRAY.to_string())]),
    );

    let mut file = PhpFile::new(config.namespace(), class);
    file.add_use(UseDecl::new(contract_fqcn(config)));
    file.add_use(UseDecl::new(field_map_fqcn(config)));
    file
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::codegen::Emit;

    #[test]
    fn test_support_files_follow_namespace() {
        let config = Config::new("Acme", "Vendor\\Acme");
        let ctx = GenerationContext::new(&config);
        let support = generate(&ctx);

        assert_eq!(support.resource_base.fqcn(), resource_base_fqcn(&config));
        let names: Vec<_> = support.others.iter().map(PhpFile::fqcn).collect();
        assert_eq!(
            names,
            vec![
                "Vendor\\Acme\\Dto",
                "Vendor\\Acme\\Contracts\\Deserializable",
                "Vendor\\Acme\\Concerns\\HasFieldMap",
            ]
        );
    }

    #[test]
    fn test_resource_base_takes_connector() {
        let config = Config::new("Acme", "App");
        let php = resource_base(&config).emit();
        assert!(php.contains("use Saloon\\Http\\Connector;"));
        assert!(php.contains("        protected Connector $connector,\n"));
    }

    #[test]
    fn test_dto_base_wires_contract_and_trait() {
        let config = Config::new("Acme", "App");
        let php = dto_base(&config).emit();
        assert!(php.contains("use App\\Concerns\\HasFieldMap;"));
        assert!(php.contains("use App\\Contracts\\Deserializable;"));
        assert!(php.contains("abstract class Dto implements Deserializable\n{\n    use HasFieldMap;\n"));
        assert!(php.contains("    protected static array $fieldMap = [];\n"));
        assert!(php.contains("    public function toArray(): array\n"));
    }

    #[test]
    fn test_field_map_trait_indents_template() {
        let config = Config::new("Acme", "App");
        let php = has_field_map(&config).emit();
        assert!(php.contains("trait HasFieldMap\n{\n"));
        assert!(php.contains("        foreach ($data as $key => $value) {\n            if (!isset(static::$fieldMap[$key])) {\n"));
        assert!(php.contains("        return new static(...$arguments);\n"));
    }
}
