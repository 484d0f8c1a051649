use anyhow::Context as _;
use gramgen::codegen::{dynamic::DynamicOptions, typed::TypedOptions};
use gramgen_tests::grammars;
use std::{env, fs, path::PathBuf};

fn main() -> anyhow::Result<()> {
    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .context("OUT_DIR is not set")?;

    let typed = TypedOptions::default();
    let typed_default = TypedOptions {
        generic: false,
        ..TypedOptions::default()
    };
    let dynamic = DynamicOptions::default();

    let arithmetic = grammars::arithmetic()?;
    let statements = grammars::statements()?;
    let postfix = grammars::postfix()?;
    let bracketed = grammars::bracketed()?;
    let outputs = [
        ("arithmetic/typed.rs", typed.generate(&arithmetic)?),
        ("arithmetic/typed_default.rs", typed_default.generate(&arithmetic)?),
        ("arithmetic/dynamic.rs", dynamic.generate(&arithmetic)?),
        ("statements/typed.rs", typed.generate(&statements)?),
        ("statements/dynamic.rs", dynamic.generate(&statements)?),
        ("postfix/dynamic.rs", dynamic.generate(&postfix)?),
        ("bracketed/dynamic.rs", dynamic.generate(&bracketed)?),
    ];
    for (path, code) in outputs {
        let path = out_dir.join(path);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, code).with_context(|| format!("failed to write {}", path.display()))?;
    }

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
