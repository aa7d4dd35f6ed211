use crate::{PhysicalAddress, VirtualAddress, map};

/// The single seam between the local address space and ring descriptors.
///
/// The ring engine calls [`to_physical`](Self::to_physical) when publishing a
/// buffer and [`to_virtual`](Self::to_virtual) when taking one out of a
/// descriptor. Swapping the platform means swapping this implementation.
pub trait AddressTranslation {
    fn to_physical(&self, va: VirtualAddress) -> PhysicalAddress;
    fn to_virtual(&self, pa: PhysicalAddress) -> VirtualAddress;
}

/// Both cores see the same addresses (host-side tests, flat memory maps).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Identity;

impl AddressTranslation for Identity {
    #[inline]
    fn to_physical(&self, va: VirtualAddress) -> PhysicalAddress {
        PhysicalAddress::new(va.as_u64())
    }

    #[inline]
    fn to_virtual(&self, pa: PhysicalAddress) -> VirtualAddress {
        VirtualAddress::new(pa.as_u64())
    }
}

/// The IPU view of the IPC carveout: 1 MiB at `0xA000_0000` on the M3 side,
/// `0x9CF0_0000` in the descriptors.
///
/// Translation keeps the offset within the window and swaps the base:
/// `(addr & (size - 1)) | other_base`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct IpuAlias;

const WINDOW_MASK: u64 = map::ALIAS_WINDOW_SIZE - 1;

const _: () = assert!(map::ALIAS_WINDOW_SIZE.is_power_of_two());
const _: () = assert!(crate::is_aligned(map::SHARED_BASE.as_u64(), map::ALIAS_WINDOW_SIZE));
const _: () = assert!(crate::is_aligned(
    map::SHARED_BASE_PHYSICAL.as_u64(),
    map::ALIAS_WINDOW_SIZE
));

impl AddressTranslation for IpuAlias {
    #[inline]
    fn to_physical(&self, va: VirtualAddress) -> PhysicalAddress {
        PhysicalAddress::new((va.as_u64() & WINDOW_MASK) | map::SHARED_BASE_PHYSICAL.as_u64())
    }

    #[inline]
    fn to_virtual(&self, pa: PhysicalAddress) -> VirtualAddress {
        VirtualAddress::new((pa.as_u64() & WINDOW_MASK) | map::SHARED_BASE.as_u64())
    }
}
