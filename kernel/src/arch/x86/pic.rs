//! Programmable Interrupt Controller (8259 PIC) driver.
//!
//! The master/slave pair is remapped to vectors 0x20-0x2F and starts with
//! every line masked; the kernel unmasks the lines it handles.

use super::port::{inb, io_wait, outb};
use crate::interrupts::{vectors, InterruptController, Irq};

const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

const ICW1_INIT: u8 = 0x11;
const ICW4_8086: u8 = 0x01;
const EOI: u8 = 0x20;

/// Handle to the chained controllers.
pub struct ChainedPics;

impl ChainedPics {
    /// Remap both controllers and mask all lines.
    ///
    /// # Safety
    ///
    /// Must run once, with interrupts disabled.
    pub unsafe fn initialize() -> Self {
        // SAFETY: the standard ICW sequence on the legacy ports.
        unsafe {
            outb(PIC1_COMMAND, ICW1_INIT);
            io_wait();
            outb(PIC2_COMMAND, ICW1_INIT);
            io_wait();
            outb(PIC1_DATA, vectors::PIC1_OFFSET);
            io_wait();
            outb(PIC2_DATA, vectors::PIC2_OFFSET);
            io_wait();
            outb(PIC1_DATA, 1 << Irq::CASCADE.0);
            io_wait();
            outb(PIC2_DATA, Irq::CASCADE.0);
            io_wait();
            outb(PIC1_DATA, ICW4_8086);
            io_wait();
            outb(PIC2_DATA, ICW4_8086);
            io_wait();

            outb(PIC1_DATA, 0xFF);
            outb(PIC2_DATA, 0xFF);
        }
        ChainedPics
    }

    fn line(irq: Irq) -> (u16, u8) {
        if irq.is_slave() {
            (PIC2_DATA, irq.0 - 8)
        } else {
            (PIC1_DATA, irq.0)
        }
    }
}

impl InterruptController for ChainedPics {
    fn enable_irq(&mut self, irq: Irq) {
        let (port, bit) = Self::line(irq);
        // SAFETY: read-modify-write of the interrupt mask register.
        unsafe { outb(port, inb(port) & !(1 << bit)) };
    }

    fn disable_irq(&mut self, irq: Irq) {
        let (port, bit) = Self::line(irq);
        // SAFETY: read-modify-write of the interrupt mask register.
        unsafe { outb(port, inb(port) | (1 << bit)) };
    }

    fn acknowledge(&mut self, irq: Irq) {
        // SAFETY: non-specific EOI to the controllers that raised `irq`.
        unsafe {
            if irq.is_slave() {
                outb(PIC2_COMMAND, EOI);
            }
            outb(PIC1_COMMAND, EOI);
        }
    }
}
