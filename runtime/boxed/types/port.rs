//! Ports
//!
//! A port is a fixed size special block. Its opaque first slot holds the native handle. The
//! direction and the open directions are stored as fixnum bit sets so both can be tested with a
//! single mask.

use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::Result;
use crate::word::Word;

const PORT_SLOTS: usize = 15;

const HANDLE_SLOT: usize = 0;
const DIRECTION_SLOT: usize = 1;
const NAME_SLOT: usize = 3;
const ROW_SLOT: usize = 4;
const COLUMN_SLOT: usize = 5;
const OPEN_SLOT: usize = 8;

/// Directions a port transfers data in
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
    InputOutput,
}

impl PortDirection {
    fn bits(self) -> isize {
        match self {
            PortDirection::Input => 1,
            PortDirection::Output => 2,
            PortDirection::InputOutput => 3,
        }
    }

    fn from_bits(bits: isize) -> Option<PortDirection> {
        match bits & 3 {
            1 => Some(PortDirection::Input),
            2 => Some(PortDirection::Output),
            3 => Some(PortDirection::InputOutput),
            _ => None,
        }
    }
}

/// Allocates an open port for a native handle
pub fn make_port(
    heap: &mut impl AsHeap,
    handle: usize,
    direction: PortDirection,
    name: Word,
) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let port = heap.alloc(BlockKind::Port, PORT_SLOTS)?;
    heap.set_raw_slot(port, HANDLE_SLOT, handle);
    for index in 1..PORT_SLOTS {
        heap.set_slot(port, index, Word::FALSE);
    }

    heap.set_slot(port, DIRECTION_SLOT, Word::fix(direction.bits()));
    heap.set_slot(port, NAME_SLOT, name);
    heap.set_slot(port, ROW_SLOT, Word::fix(1));
    heap.set_slot(port, COLUMN_SLOT, Word::fix(0));
    heap.set_slot(port, OPEN_SLOT, Word::fix(direction.bits()));

    Ok(port)
}

pub fn portp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::Port))
}

fn flags(heap: &Heap, port: Word, slot: usize) -> isize {
    let value = heap.slot(port, slot);
    if value.is_fixnum() {
        value.unfix()
    } else {
        0
    }
}

/// Returns a port after checking it supports `direction` and is still open
///
/// A port lacking only input faults with [`PortNoInput`](crate::fault::FaultCode::PortNoInput)
/// and one lacking only output with
/// [`PortNoOutput`](crate::fault::FaultCode::PortNoOutput). Ports that must be both but are neither
/// fault with [`PortDirection`](crate::fault::FaultCode::PortDirection).
pub fn check_port(
    heap: &impl AsHeap,
    x: Word,
    direction: Option<PortDirection>,
    require_open: bool,
) -> Result<Word> {
    let heap = heap.as_heap();
    let site = "check-port";

    if !heap.has_kind(x, BlockKind::Port) {
        return fault!(NoPort, site, x);
    }

    let supported = flags(heap, x, DIRECTION_SLOT);
    let required = direction.map_or(0, PortDirection::bits);

    if supported & required != required {
        return match PortDirection::from_bits(required & !supported) {
            Some(PortDirection::Input) => fault!(PortNoInput, site, x),
            Some(PortDirection::Output) => fault!(PortNoOutput, site, x),
            _ => fault!(PortDirection, site, x),
        };
    }

    if require_open {
        let open = flags(heap, x, OPEN_SLOT);
        let closed = if required == 0 {
            open == 0
        } else {
            open & required != required
        };

        if closed {
            return fault!(PortClosed, site, x);
        }
    }

    Ok(x)
}

/// Returns the directions a port supports
pub fn port_direction(heap: &impl AsHeap, port: Word) -> Result<Option<PortDirection>> {
    let port = check_port(heap, port, None, false)?;
    Ok(PortDirection::from_bits(flags(heap.as_heap(), port, DIRECTION_SLOT)))
}

/// Returns `#t` if the port is open in every given direction
pub fn port_openp(heap: &impl AsHeap, port: Word, direction: PortDirection) -> Result<Word> {
    let port = check_port(heap, port, None, false)?;

    let required = direction.bits();
    Ok(Word::make_bool(
        flags(heap.as_heap(), port, OPEN_SLOT) & required == required,
    ))
}

/// Returns the native handle of an open port
pub fn port_handle(heap: &impl AsHeap, port: Word) -> Result<usize> {
    let port = check_port(heap, port, None, true)?;
    Ok(heap.as_heap().raw_slot(port, HANDLE_SLOT))
}

pub fn port_name(heap: &impl AsHeap, port: Word) -> Result<Word> {
    let port = check_port(heap, port, None, false)?;
    Ok(heap.as_heap().slot(port, NAME_SLOT))
}

/// Closes a port in the given directions
///
/// Closing an already closed direction has no effect.
pub fn close_port(heap: &mut impl AsHeap, port: Word, direction: PortDirection) -> Result<()> {
    let port = check_port(&*heap, port, None, false)?;
    let heap = heap.as_heap_mut();

    let open = flags(heap, port, OPEN_SLOT) & !direction.bits();
    heap.set_slot(port, OPEN_SLOT, Word::fix(open));

    log::debug!("closed {:?} of port {:?}", direction, port);
    Ok(())
}
