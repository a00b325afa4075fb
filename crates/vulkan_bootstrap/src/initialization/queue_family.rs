//! Queue family discovery
//!
//! Families are walked in index order. Each capability slot records the index
//! of the family that last matched, and the walk stops as soon as all four
//! slots are filled. Presentation support is queried inside the same
//! iteration, after the graphics check; which index it queries is chosen by
//! [`PresentationProbe`].

use ash::vk;
use serde::{Deserialize, Serialize};

use crate::backend::VulkanApi;
use crate::error::BootstrapResult;

/// Queue family index per capability, each possibly unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueFamilyIndices {
    /// Family with graphics support
    pub graphics: Option<u32>,
    /// Family able to present to the surface
    pub presentation: Option<u32>,
    /// Family with compute support
    pub compute: Option<u32>,
    /// Family with transfer support
    pub transfer: Option<u32>,
}

impl QueueFamilyIndices {
    /// All four capabilities have a family
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.presentation.is_some() && self.compute.is_some() && self.transfer.is_some()
    }
}

/// Which family index the per-iteration presentation query uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationProbe {
    /// Query the graphics family recorded so far, and only once one is recorded.
    /// Presentation can then only ever share the graphics family.
    #[default]
    GraphicsFamily,
    /// Query the family currently being iterated
    IteratedFamily,
}

/// Resolve family indices from already-fetched family properties
///
/// `supports_present` answers whether a family index can present to the surface.
pub fn resolve_from_properties<F>(
    families: &[vk::QueueFamilyProperties],
    probe: PresentationProbe,
    mut supports_present: F,
) -> QueueFamilyIndices
where
    F: FnMut(u32) -> bool,
{
    let mut indices = QueueFamilyIndices::default();

    for (index, family) in (0u32..).zip(families) {
        let flags = family.queue_flags;

        if flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics = Some(index);
        }

        let candidate = match probe {
            PresentationProbe::GraphicsFamily => indices.graphics,
            PresentationProbe::IteratedFamily => Some(index),
        };
        if let Some(candidate) = candidate {
            if supports_present(candidate) {
                indices.presentation = Some(candidate);
            }
        }

        if flags.contains(vk::QueueFlags::COMPUTE) {
            indices.compute = Some(index);
        }

        if flags.contains(vk::QueueFlags::TRANSFER) {
            indices.transfer = Some(index);
        }

        if indices.is_complete() {
            break;
        }
    }

    indices
}

/// Resolve family indices for `physical_device` against `surface`
///
/// A failed support query counts as "cannot present". The result may be
/// incomplete; callers decide which gaps are fatal.
pub fn resolve_queue_families<A: VulkanApi>(
    api: &A,
    instance: vk::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    probe: PresentationProbe,
) -> BootstrapResult<QueueFamilyIndices> {
    let families = api.queue_family_properties(instance, physical_device)?;

    let indices = resolve_from_properties(&families, probe, |family_index| {
        api.surface_support(physical_device, family_index, surface)
            .unwrap_or_else(|e| {
                log::warn!("Surface support query for family {family_index} failed: {e}");
                false
            })
    });

    if indices.is_complete() {
        log::debug!("Queue families resolved: {:?}", indices);
    } else {
        log::warn!("Incomplete queue family set: {:?}", indices);
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{FakeGpu, FakeVulkan};

    const ALL: vk::QueueFlags = vk::QueueFlags::from_raw(
        vk::QueueFlags::GRAPHICS.as_raw() | vk::QueueFlags::COMPUTE.as_raw() | vk::QueueFlags::TRANSFER.as_raw(),
    );

    fn families(flags: &[vk::QueueFlags]) -> Vec<vk::QueueFamilyProperties> {
        flags
            .iter()
            .map(|flags| vk::QueueFamilyProperties {
                queue_flags: *flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_completeness_requires_all_four() {
        let slots = [Some(0), None];
        for graphics in slots {
            for presentation in slots {
                for compute in slots {
                    for transfer in slots {
                        let indices = QueueFamilyIndices {
                            graphics,
                            presentation,
                            compute,
                            transfer,
                        };
                        let expected =
                            graphics.is_some() && presentation.is_some() && compute.is_some() && transfer.is_some();
                        assert_eq!(indices.is_complete(), expected, "{indices:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_single_universal_family() {
        let indices = resolve_from_properties(&families(&[ALL]), PresentationProbe::GraphicsFamily, |_| true);

        assert_eq!(
            indices,
            QueueFamilyIndices {
                graphics: Some(0),
                presentation: Some(0),
                compute: Some(0),
                transfer: Some(0),
            }
        );
        assert!(indices.is_complete());
    }

    #[test]
    fn test_missing_capability_leaves_set_incomplete() {
        let indices = resolve_from_properties(
            &families(&[vk::QueueFlags::GRAPHICS, vk::QueueFlags::COMPUTE]),
            PresentationProbe::GraphicsFamily,
            |_| true,
        );

        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.presentation, Some(0));
        assert_eq!(indices.compute, Some(1));
        assert_eq!(indices.transfer, None);
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_iteration_stops_once_complete() {
        let mut probed = Vec::new();
        let indices = resolve_from_properties(&families(&[ALL, ALL, ALL]), PresentationProbe::GraphicsFamily, |i| {
            probed.push(i);
            true
        });

        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.transfer, Some(0));
        assert_eq!(probed, vec![0]);
    }

    #[test]
    fn test_graphics_probe_only_queries_graphics_index() {
        let mut probed = Vec::new();
        let indices = resolve_from_properties(
            &families(&[vk::QueueFlags::TRANSFER, vk::QueueFlags::GRAPHICS, vk::QueueFlags::COMPUTE]),
            PresentationProbe::GraphicsFamily,
            |i| {
                probed.push(i);
                i == 2
            },
        );

        // Nothing is probed before a graphics family exists, then always family 1
        assert_eq!(probed, vec![1, 1]);
        assert_eq!(indices.presentation, None);
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.compute, Some(2));
        assert_eq!(indices.transfer, Some(0));
    }

    #[test]
    fn test_iterated_probe_finds_separate_present_family() {
        let props = families(&[vk::QueueFlags::GRAPHICS, vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER]);

        let coupled = resolve_from_properties(&props, PresentationProbe::GraphicsFamily, |i| i == 1);
        assert_eq!(coupled.presentation, None);

        let iterated = resolve_from_properties(&props, PresentationProbe::IteratedFamily, |i| i == 1);
        assert_eq!(iterated.graphics, Some(0));
        assert_eq!(iterated.presentation, Some(1));
        assert!(iterated.is_complete());
    }

    #[test]
    fn test_later_graphics_family_overwrites_while_incomplete() {
        let indices = resolve_from_properties(
            &families(&[vk::QueueFlags::GRAPHICS, vk::QueueFlags::GRAPHICS]),
            PresentationProbe::GraphicsFamily,
            |i| i == 1,
        );

        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.presentation, Some(1));
    }

    #[test]
    fn test_resolve_through_api() {
        let api = FakeVulkan::with_gpus(vec![FakeGpu::discrete("gpu").with_families(&[
            (vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, true),
            (vk::QueueFlags::TRANSFER, false),
        ])]);

        let indices = resolve_queue_families(
            &api,
            vk::Instance::null(),
            api.gpu(0),
            vk::SurfaceKHR::null(),
            PresentationProbe::GraphicsFamily,
        )
        .unwrap();

        assert_eq!(
            indices,
            QueueFamilyIndices {
                graphics: Some(0),
                presentation: Some(0),
                compute: Some(0),
                transfer: Some(1),
            }
        );
    }
}
