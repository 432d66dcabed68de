//! Built-in smoke module.
//!
//! # Responsibility
//! - Provide an entry point for the `isoboot-smoke` artifact so a bare
//!   installation can be bootstrapped end to end.
//! - Report which resolver tier answers a few well-known lookups, then return.

use isoboot_core::{
    ArtifactModule, Closeable, Constructor, LoadError, ModuleCatalog, ResolverChain, Runnable,
    ServerError, ENTRY_POINT_TYPE,
};
use log::info;

pub const SMOKE_MODULE: &str = "isoboot-smoke";

const LOOKED_UP_RESOURCES: [&str; 3] = [
    "isoboot/build.properties",
    "isoboot/smoke.properties",
    "logging.properties",
];

#[derive(Debug, Default)]
pub struct SmokeServer {
    lookups: usize,
}

impl Runnable for SmokeServer {
    fn run(&mut self, resolver: &ResolverChain) -> Result<(), ServerError> {
        let entry_tier = resolver
            .resolve_type(ENTRY_POINT_TYPE)
            .map_err(|err| ServerError::with_source("entry point vanished during run", err))?
            .tier;
        println!("type {ENTRY_POINT_TYPE} tier={}", entry_tier.as_str());

        for name in LOOKED_UP_RESOURCES {
            self.lookups += 1;
            let tier = resolver
                .resolve_resource(name)
                .map(|resolved| resolved.tier.as_str())
                .unwrap_or("none");
            println!("resource {name} tier={tier}");
        }
        Ok(())
    }
}

impl Closeable for SmokeServer {
    fn close(&mut self) -> Result<(), ServerError> {
        info!(
            "event=smoke_close module=smoke status=ok lookups={}",
            self.lookups
        );
        Ok(())
    }
}

/// Catalog of modules linked into this binary.
pub fn catalog(suffix: &str) -> Result<ModuleCatalog, LoadError> {
    let mut catalog = ModuleCatalog::new(suffix);
    catalog.register(
        ArtifactModule::new(SMOKE_MODULE)
            .with_type(ENTRY_POINT_TYPE, Constructor::of_default::<SmokeServer>())
            .with_resource("isoboot/smoke.properties", b"module=isoboot-smoke\n"),
    )?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::{catalog, SMOKE_MODULE};

    #[test]
    fn catalog_links_the_smoke_module() {
        let catalog = catalog(".jar").expect("smoke catalog should build");
        assert_eq!(catalog.module_names(), vec![SMOKE_MODULE.to_string()]);
    }
}
