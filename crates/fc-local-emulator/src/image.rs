use fc_local_core::{FunctionDescriptor, LocalError, Runtime};

use crate::config::DockerConfig;

/// The image a local container runs, and whether it is a stock emulation
/// image that should be pulled first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulationImage {
    pub reference: String,
    pub stock: bool,
}

/// Pick the image for a runtime.
///
/// custom-container uses its own image (VPC registries rewritten to their
/// public endpoint). Other runtimes use the configured override or the stock
/// `<registry>/<namespace>/runtime-<runtime>:<version>` image.
pub fn resolve_image(
    runtime: Runtime,
    descriptor: &FunctionDescriptor,
    docker: &DockerConfig,
) -> Result<EmulationImage, LocalError> {
    if runtime == Runtime::CustomContainer {
        let image = descriptor
            .custom_container_config
            .as_ref()
            .and_then(|c| c.image.as_deref())
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| {
                LocalError::InvalidDescriptor(
                    "customContainerConfig.image is required for custom-container".into(),
                )
            })?;
        let reference = vpc_image_to_internet_image(image);
        tracing::debug!(image = %reference, "Using custom container image");
        return Ok(EmulationImage {
            reference,
            stock: false,
        });
    }

    if let Some(image) = &docker.image {
        tracing::debug!(image = %image, "Using configured emulation image");
        return Ok(EmulationImage {
            reference: image.clone(),
            stock: false,
        });
    }

    let reference = format!(
        "{}/{}/runtime-{}:{}",
        docker.registry,
        docker.namespace,
        runtime.image_name(),
        docker.version
    );
    tracing::debug!(image = %reference, "Using stock emulation image");
    Ok(EmulationImage {
        reference,
        stock: true,
    })
}

/// Rewrite an ACR VPC endpoint (`registry-vpc.<region>...`) to its internet
/// endpoint; local hosts are never inside the VPC.
pub fn vpc_image_to_internet_image(image: &str) -> String {
    match image.split_once('/') {
        Some((registry, rest)) if registry.contains("registry-vpc") => {
            format!("{}/{rest}", registry.replacen("registry-vpc", "registry", 1))
        }
        _ => image.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_local_core::descriptor::CustomContainerConfig;

    fn descriptor(runtime: &str) -> FunctionDescriptor {
        FunctionDescriptor {
            runtime: runtime.into(),
            ..Default::default()
        }
    }

    #[test]
    fn stock_image_reference() {
        let image =
            resolve_image(Runtime::Nodejs14, &descriptor("nodejs14"), &DockerConfig::default())
                .unwrap();
        assert_eq!(
            image.reference,
            "registry.hub.docker.com/aliyunfc/runtime-nodejs14:3.0.0"
        );
        assert!(image.stock);
    }

    #[test]
    fn python3_maps_to_python36_image() {
        let image =
            resolve_image(Runtime::Python3, &descriptor("python3"), &DockerConfig::default())
                .unwrap();
        assert_eq!(
            image.reference,
            "registry.hub.docker.com/aliyunfc/runtime-python3.6:3.0.0"
        );
    }

    #[test]
    fn configured_image_is_not_stock() {
        let docker = DockerConfig {
            image: Some("mirror.local/fc:dev".into()),
            ..Default::default()
        };
        let image = resolve_image(Runtime::Java8, &descriptor("java8"), &docker).unwrap();
        assert_eq!(image.reference, "mirror.local/fc:dev");
        assert!(!image.stock);
    }

    #[test]
    fn custom_container_rewrites_vpc_registry() {
        let mut d = descriptor("custom-container");
        d.custom_container_config = Some(CustomContainerConfig {
            image: Some("registry-vpc.cn-hangzhou.aliyuncs.com/ns/app:1".into()),
            ..Default::default()
        });
        let image = resolve_image(Runtime::CustomContainer, &d, &DockerConfig::default()).unwrap();
        assert_eq!(image.reference, "registry.cn-hangzhou.aliyuncs.com/ns/app:1");
        assert!(!image.stock);
    }

    #[test]
    fn custom_container_requires_image() {
        let result = resolve_image(
            Runtime::CustomContainer,
            &descriptor("custom-container"),
            &DockerConfig::default(),
        );
        assert!(matches!(result, Err(LocalError::InvalidDescriptor(_))));
    }

    #[test]
    fn non_vpc_images_are_untouched() {
        assert_eq!(vpc_image_to_internet_image("nginx:latest"), "nginx:latest");
        assert_eq!(
            vpc_image_to_internet_image("docker.io/library/registry-vpc:1"),
            "docker.io/library/registry-vpc:1"
        );
    }
}
