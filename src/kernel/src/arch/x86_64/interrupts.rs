//! Interrupt wiring: the IDT, the 8259 PICs and the console's IRQ lines.
//!
//! Only the lines the console subsystem needs are unmasked. Exception
//! reports go straight to COM1 because the faulting code may hold the
//! console lock.

use lazy_static::lazy_static;
use pic8259::ChainedPics;
use spin::Mutex;
use x86_64::instructions::port::Port;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};

use super::serial::emergency_print;

/// Vector of IRQ 0; IRQs 8..15 follow at `PIC_1_OFFSET + 8`.
pub const PIC_1_OFFSET: u8 = 32;
/// Vector of IRQ 8.
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

/// PS/2 controller data port.
const KEYBOARD_DATA_PORT: u16 = 0x60;

// SAFETY: the offsets keep the IRQ vectors clear of the CPU exceptions.
static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

/// IRQ lines the console subsystem listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Irq {
    /// IRQ0. Only acknowledged; it wakes halted readers.
    Timer = 0,
    /// IRQ1.
    Keyboard = 1,
    /// IRQ4, COM1 received data.
    Com1 = 4,
}

impl Irq {
    const ALL: [Irq; 3] = [Irq::Timer, Irq::Keyboard, Irq::Com1];

    /// IDT vector of this line.
    pub fn vector(self) -> u8 {
        PIC_1_OFFSET + self as u8
    }

    /// Primary PIC mask with only the console lines open. The secondary
    /// PIC stays fully masked.
    fn primary_mask() -> u8 {
        Self::ALL.iter().fold(0xff, |mask, irq| mask & !(1 << *irq as u8))
    }
}

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        idt.breakpoint.set_handler_fn(breakpoint_handler);
        idt.double_fault.set_handler_fn(double_fault_handler);
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt.general_protection_fault.set_handler_fn(general_protection_fault_handler);
        idt.divide_error.set_handler_fn(divide_error_handler);

        idt[usize::from(Irq::Timer.vector())].set_handler_fn(timer_interrupt_handler);
        idt[usize::from(Irq::Keyboard.vector())].set_handler_fn(keyboard_interrupt_handler);
        idt[usize::from(Irq::Com1.vector())].set_handler_fn(com1_interrupt_handler);
        idt
    };
}

/// Loads the IDT, programs the PICs and enables interrupts.
pub fn init() {
    IDT.load();
    let mut pics = PICS.lock();
    // SAFETY: remaps the PICs to the vectors installed above before any
    // IRQ is let through.
    unsafe {
        pics.initialize();
        pics.write_masks(Irq::primary_mask(), 0xff);
    }
    drop(pics);
    x86_64::instructions::interrupts::enable();
}

fn end_of_interrupt(irq: Irq) {
    // SAFETY: called once at the end of the handler for `irq`.
    unsafe {
        PICS.lock().notify_end_of_interrupt(irq.vector());
    }
}

extern "x86-interrupt" fn timer_interrupt_handler(_stack_frame: InterruptStackFrame) {
    end_of_interrupt(Irq::Timer);
}

extern "x86-interrupt" fn keyboard_interrupt_handler(_stack_frame: InterruptStackFrame) {
    let mut port = Port::new(KEYBOARD_DATA_PORT);
    // SAFETY: reading the PS/2 data port acknowledges the pending byte.
    let scancode: u8 = unsafe { port.read() };
    super::machine::keyboard_input(scancode);
    end_of_interrupt(Irq::Keyboard);
}

extern "x86-interrupt" fn com1_interrupt_handler(_stack_frame: InterruptStackFrame) {
    super::machine::serial_input();
    end_of_interrupt(Irq::Com1);
}

extern "x86-interrupt" fn breakpoint_handler(stack_frame: InterruptStackFrame) {
    emergency_print(format_args!("EXCEPTION: BREAKPOINT\n{:#?}\n", stack_frame));
}

extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) -> ! {
    panic!("EXCEPTION: DOUBLE FAULT\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn page_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: PageFaultErrorCode,
) {
    use x86_64::registers::control::Cr2;

    panic!(
        "EXCEPTION: PAGE FAULT at {:?} ({:?})\n{:#?}",
        Cr2::read(),
        error_code,
        stack_frame
    );
}

extern "x86-interrupt" fn general_protection_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    panic!("EXCEPTION: GENERAL PROTECTION FAULT ({:#x})\n{:#?}", error_code, stack_frame);
}

extern "x86-interrupt" fn divide_error_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: DIVIDE ERROR\n{:#?}", stack_frame);
}
